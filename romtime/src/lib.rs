// Licensed under the Apache-2.0 license

#![cfg_attr(target_arch = "riscv64", no_std)]

// Helpers to handle writing to the console and leaving the test harness.

use core::cell::RefCell;
use core::fmt::Write;
use critical_section::Mutex;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

static WRITER: Mutex<RefCell<Option<&'static mut (dyn Write + Send)>>> =
    Mutex::new(RefCell::new(None));
static EXITER: Mutex<RefCell<Option<&'static mut (dyn Exit + Send)>>> =
    Mutex::new(RefCell::new(None));

/// Sets the global backing writer for `print` and `println` macros.
pub fn set_printer(writer: &'static mut (dyn Write + Send)) {
    critical_section::with(|cs| {
        WRITER.borrow_ref_mut(cs).replace(writer);
    });
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    critical_section::with(|cs| {
        if let Some(writer) = WRITER.borrow_ref_mut(cs).as_mut() {
            let _ = writer.write_fmt(args);
        }
    });
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => {
        $crate::_print(format_args!("\n"))
    };
    ($($arg:tt)*) => {
        $crate::_print(format_args!("{}\n", format_args!($($arg)*)))
    };
}

/// `log` backend that prints through the console writer.
pub struct RomLogger {
    level: LevelFilter,
}

impl RomLogger {
    pub const fn new(level: LevelFilter) -> Self {
        RomLogger { level }
    }
}

impl Log for RomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs `logger` as the global `log` backend.
pub fn init_logger(logger: &'static RomLogger) -> Result<(), SetLoggerError> {
    log::set_logger(logger)?;
    log::set_max_level(logger.level);
    Ok(())
}

/// Process-exit primitive provided by the boot environment (HTIF, a test
/// finisher register, ...).
pub trait Exit {
    fn exit(&mut self, code: i32);
}

pub fn set_exiter(exiter: &'static mut (dyn Exit + Send)) {
    critical_section::with(|cs| {
        EXITER.borrow_ref_mut(cs).replace(exiter);
    });
}

/// Leaves the program with `code`. Spins forever if no exiter is set or the
/// exiter returns.
pub fn process_exit(code: i32) -> ! {
    let exiter = critical_section::with(|cs| EXITER.borrow_ref_mut(cs).take());
    if let Some(exiter) = exiter {
        exiter.exit(code);
    }
    #[allow(clippy::empty_loop)]
    loop {
        core::hint::spin_loop();
    }
}
