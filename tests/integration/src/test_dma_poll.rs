// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{copy_words, load_sample_data, new_bus, DST, LEN, SRC};
    use dsp_config::WaitLimit;
    use dsp_emulator::{BusArgs, EmulatedBus, EmulatedHart, TracingBus};
    use dsp_hal::{
        ticks, verify, Completion, Dma, DmaError, DmaTransaction, Mmio, ReportPolicy, Width,
    };
    use dsp_registers::dma;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    const CH0: usize = dma::DMA_ADDR + dma::CHANNEL_WINDOW_OFFSET;

    #[test]
    fn test_mm_basic_poll() {
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        load_sample_data(&bus);

        let tx = DmaTransaction {
            do_interrupt: false,
            ..copy_words(0, 0, LEN as u16)
        };
        let start = ticks(&hart);
        dma.configure_memory_to_memory(0, &tx, true).unwrap();
        dma.start(0, 0, None).unwrap();
        dma.wait_poll(5, WaitLimit::Spins(10_000)).unwrap();
        dma.reset();
        assert!(ticks(&hart) > start);

        for i in 0..LEN {
            assert!(verify(
                &bus,
                i,
                i as u64 + 1,
                DST + 4 * i,
                Width::Word,
                ReportPolicy::OnMismatch
            ));
        }
        assert!(dma.tracker().is_empty());
    }

    #[test]
    fn test_byte_packets_with_stride() {
        let bus = new_bus();
        let dma: Dma<_> = Dma::new(&bus);
        load_sample_data(&bus);

        // low byte of every word
        let tx = DmaTransaction {
            inc_r: 4,
            inc_w: 1,
            logw: 0,
            len: 8,
            do_interrupt: false,
            ..copy_words(0, 0, 8)
        };
        dma.configure_memory_to_memory(2, &tx, false).unwrap();
        dma.start(2, 0, None).unwrap();
        dma.wait_poll(5, WaitLimit::Spins(10_000)).unwrap();
        assert_eq!(bus.dump_memory(DST, 8), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_mode_write_elision() {
        let bus = EmulatedBus::new(BusArgs {
            peripheral_channels: vec![6],
            ..Default::default()
        });
        let trace = TracingBus::new(&bus);
        let dma: Dma<_> = Dma::new(&trace);

        dma.configure_memory_to_memory(0, &copy_words(0, 0, 8), false)
            .unwrap();
        assert!(trace.writes_to(CH0 + dma::MODE).is_empty());
        dma.release_channel(0).unwrap();

        let no_irq = DmaTransaction {
            do_interrupt: false,
            ..copy_words(1, 0, 8)
        };
        dma.configure_memory_to_memory(0, &no_irq, false).unwrap();
        assert_eq!(trace.writes_to(CH0 + dma::MODE), vec![0]);

        let ch6 = CH0 + 6 * dma::CHANNEL_WINDOW_STRIDE;
        let to_periph = DmaTransaction {
            do_address_gate: true,
            inc_w: 0,
            peripheral_id: 3,
            ..copy_words(2, 0, 8)
        };
        dma.configure_memory_to_peripheral(6, &to_periph, false)
            .unwrap();
        assert!(trace.writes_to(ch6 + dma::MODE).is_empty());
        assert!(trace.writes_to(ch6 + dma::WRITE_STRIDE).is_empty());
        assert_eq!(trace.writes_to(ch6 + dma::READ_STRIDE), vec![4]);
        assert_eq!(trace.writes_to(ch6 + dma::PERIPHERAL_ID), vec![3]);
        assert_eq!(bus.read8(ch6 + dma::MODE), 0b11);
    }

    #[test]
    fn test_acquire_is_mutually_exclusive() {
        let bus = new_bus();
        let dma: Dma<_> = Dma::new(&bus);
        let barrier = Barrier::new(2);
        let (dma, barrier) = (&dma, &barrier);

        let results: Vec<Result<(), DmaError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(move || {
                        barrier.wait();
                        dma.acquire_channel(0, false)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.contains(&Err(DmaError::ChannelBusy(0))));
    }

    #[test]
    fn test_acquire_retry_waits_for_release() {
        let bus = new_bus();
        let dma: Dma<_> = Dma::new(&bus);
        dma.acquire_channel(1, false).unwrap();

        thread::scope(|s| {
            let waiter = s.spawn(|| dma.acquire_channel(1, true));
            thread::sleep(Duration::from_millis(20));
            assert!(!waiter.is_finished());
            dma.release_channel(1).unwrap();
            assert_eq!(waiter.join().unwrap(), Ok(()));
        });
        assert_eq!(dma.acquire_channel(1, false), Err(DmaError::ChannelBusy(1)));
    }

    #[test]
    fn test_invalid_channel() {
        let bus = new_bus();
        let dma: Dma<_> = Dma::new(&bus);
        assert_eq!(
            dma.configure_memory_to_memory(7, &copy_words(0, 0, 8), true),
            Err(DmaError::InvalidChannel(7))
        );
        assert_eq!(dma.start(9, 0, None), Err(DmaError::InvalidChannel(9)));
    }

    #[test]
    fn test_full_tracker_releases_channel() {
        let done: [Completion; 3] = Default::default();
        let bus = new_bus();
        let dma = Dma::<_, 2>::new(&bus);
        for (ch, completion) in done.iter().enumerate() {
            let ch = ch as u32;
            dma.configure_memory_to_memory(ch, &copy_words(ch as u16, 0, 8), false)
                .unwrap();
            let result = dma.start(ch, ch as u16, Some(completion));
            if ch < 2 {
                assert_eq!(result, Ok(()));
            } else {
                assert_eq!(result, Err(DmaError::TrackerFull));
            }
        }
        assert_eq!(dma.status(), 2);
        assert_eq!(dma.acquire_channel(2, false), Ok(()));
    }

    // The DMA wait path never gives up on real hardware unless bounded.
    #[test]
    fn test_wait_times_out_instead_of_hanging() {
        let done = Completion::new();
        let bus = EmulatedBus::new(BusArgs {
            dma_latency: u64::MAX,
            ..Default::default()
        });
        let dma: Dma<_> = Dma::new(&bus);

        dma.configure_memory_to_memory(0, &copy_words(4, 0, 8), false)
            .unwrap();
        dma.start(0, 4, Some(&done)).unwrap();
        assert_eq!(dma.wait_poll(5, WaitLimit::Spins(1000)), Err(DmaError::Timeout));
        assert_eq!(
            dma.wait_interrupt(&done, WaitLimit::Spins(1000)),
            Err(DmaError::Timeout)
        );
        assert_eq!(
            dma.wait_for_core(0, &done, WaitLimit::Spins(1000)),
            Err(DmaError::Timeout)
        );
        assert!(!done.is_complete());

        dma.reset();
        assert_eq!(dma.status(), 0);
        assert_eq!(dma.teardown(), 1);
        assert!(!done.is_complete());
    }

    #[test]
    fn test_source_untouched_by_copy() {
        let bus = new_bus();
        let dma: Dma<_> = Dma::new(&bus);
        load_sample_data(&bus);
        let tx = DmaTransaction {
            do_interrupt: false,
            ..copy_words(0, 0, LEN as u16)
        };
        dma.configure_memory_to_memory(3, &tx, false).unwrap();
        dma.start(3, 0, None).unwrap();
        dma.wait_poll(5, WaitLimit::Spins(10_000)).unwrap();
        assert_eq!(bus.dump_memory(SRC, 4 * LEN), bus.dump_memory(DST, 4 * LEN));
    }
}
