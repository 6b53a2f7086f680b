// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{
        copy_words, load_sample_data, new_bus, service_for, service_until, DST, LEN,
    };
    use dsp_config::{WaitLimit, DMA_WAIT_LIMIT};
    use dsp_emulator::EmulatedHart;
    use dsp_hal::{
        install_trap_vector, verify, Completion, Dma, DmaTransaction, Mmio, ReportPolicy,
        TrapOutcome, Width,
    };
    use dsp_registers::csr::{MACHINE_EXTERNAL_INTERRUPT, MCAUSE_INTERRUPT};
    use dsp_registers::plic::{self, PLIC_ADDR};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_sequential_transactions() {
        let done: [Completion; 5] = Default::default();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        load_sample_data(&bus);
        dma.configure_interrupts(&hart);
        assert!(hart.external_interrupts_enabled());

        for (t, completion) in done.iter().enumerate() {
            let tx = copy_words(t as u16, (t * 8) % LEN, 8);
            dma.configure_memory_to_memory(0, &tx, true).unwrap();
            dma.start(0, t as u16, Some(completion)).unwrap();
            let outcomes = service_until(&bus, &dma, 0, completion);
            assert_eq!(outcomes, vec![TrapOutcome::Completed(t as u16)]);
            assert!(!completion.failed());
        }

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
    fn test_wait_interrupt_with_hart_thread() {
        let done = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        load_sample_data(&bus);
        dma.configure_interrupts(&hart);
        let stop = AtomicBool::new(false);
        let (bus, dma, stop) = (&bus, &dma, &stop);

        thread::scope(|s| {
            s.spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    bus.step();
                    if bus.external_interrupt_pending(0) {
                        dma.handle_trap(MACHINE_EXTERNAL_INTERRUPT, 0);
                    }
                }
            });

            dma.configure_memory_to_memory(0, &copy_words(11, 0, LEN as u16), true)
                .unwrap();
            dma.start(0, 11, Some(&done)).unwrap();
            let result = dma.wait_interrupt(&done, DMA_WAIT_LIMIT);
            stop.store(true, Ordering::Release);
            assert_eq!(result, Ok(()));
        });

        assert!(done.is_complete());
        assert_eq!(bus.dump_memory(DST + 4 * (LEN - 1), 4), (LEN as u32).to_le_bytes());
    }

    #[test]
    fn test_stale_completion_then_tracked() {
        let done = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        dma.configure_interrupts(&hart);

        dma.configure_memory_to_memory(1, &copy_words(20, 0, 8), false)
            .unwrap();
        dma.start(1, 20, None).unwrap();
        dma.configure_memory_to_memory(0, &copy_words(21, 8, 8), false)
            .unwrap();
        dma.start(0, 21, Some(&done)).unwrap();

        let outcomes = service_until(&bus, &dma, 0, &done);
        assert_eq!(
            outcomes,
            vec![TrapOutcome::Stale(20), TrapOutcome::Completed(21)]
        );
    }

    #[test]
    fn test_foreign_source_is_left_claimed() {
        let done = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        dma.configure_interrupts(&hart);
        // another device shares core 0's enable word
        bus.write32(PLIC_ADDR + plic::enable(0), (1 << 4) | (1 << 9));
        bus.write32(PLIC_ADDR + plic::priority(9), 6);

        dma.configure_memory_to_memory(0, &copy_words(1, 0, 8), false)
            .unwrap();
        dma.start(0, 1, Some(&done)).unwrap();
        bus.raise_interrupt(9);

        let outcomes = service_until(&bus, &dma, 0, &done);
        assert_eq!(
            outcomes,
            vec![TrapOutcome::Foreign(9), TrapOutcome::Completed(1)]
        );

        bus.raise_interrupt(9);
        assert!(!bus.external_interrupt_pending(0));
    }

    #[test]
    fn test_spurious_claim_is_foreign() {
        let bus = new_bus();
        let dma: Dma<_> = Dma::new(&bus);
        assert_eq!(
            dma.handle_trap(MACHINE_EXTERNAL_INTERRUPT, 0),
            TrapOutcome::Foreign(0)
        );
    }

    #[test]
    fn test_address_gate_fault_fails_completion() {
        let done = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        dma.configure_interrupts(&hart);

        let tx = DmaTransaction {
            addr_w: 0x1000_0000,
            do_address_gate: true,
            ..copy_words(2, 0, 8)
        };
        dma.configure_memory_to_memory(0, &tx, false).unwrap();
        dma.start(0, 2, Some(&done)).unwrap();

        let outcomes = service_until(&bus, &dma, 0, &done);
        assert_eq!(outcomes, vec![TrapOutcome::Completed(2)]);
        assert!(done.is_complete());
        assert!(done.failed());
        assert!(bus.take_faults().is_empty());
    }

    #[test]
    fn test_wait_for_core_then_late_trap() {
        let done = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        dma.configure_interrupts(&hart);

        dma.configure_memory_to_memory(0, &copy_words(5, 0, 8), false)
            .unwrap();
        dma.start(0, 5, Some(&done)).unwrap();
        for _ in 0..64 {
            bus.step();
        }
        assert!(bus.external_interrupt_pending(0));

        assert_eq!(dma.wait_for_core(0, &done, WaitLimit::Spins(10)), Ok(()));
        assert!(done.is_complete());

        // the PLIC edge is still pending
        assert_eq!(
            dma.handle_trap(MACHINE_EXTERNAL_INTERRUPT, 0),
            TrapOutcome::Spurious(4)
        );
        assert!(!bus.external_interrupt_pending(0));
    }

    #[test]
    fn test_reused_id_not_resolved_by_leftover_edge() {
        let first = Completion::new();
        let second = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        load_sample_data(&bus);
        dma.configure_interrupts(&hart);

        dma.configure_memory_to_memory(0, &copy_words(5, 0, 8), false)
            .unwrap();
        dma.start(0, 5, Some(&first)).unwrap();
        for _ in 0..64 {
            bus.step();
        }
        assert_eq!(dma.wait_for_core(0, &first, WaitLimit::Spins(10)), Ok(()));

        // same id, new transfer, while the old edge is still latched
        dma.configure_memory_to_memory(0, &copy_words(5, 8, 8), false)
            .unwrap();
        dma.start(0, 5, Some(&second)).unwrap();
        assert_eq!(
            dma.handle_trap(MACHINE_EXTERNAL_INTERRUPT, 0),
            TrapOutcome::Spurious(4)
        );
        assert!(!second.is_complete());
        assert_eq!(dma.status(), 1);

        assert_eq!(
            service_until(&bus, &dma, 0, &second),
            vec![TrapOutcome::Completed(5)]
        );
        assert_eq!(bus.dump_memory(DST + 4 * 8, 4), 9u32.to_le_bytes());
    }

    #[test]
    fn test_teardown_leaves_late_completions_stale() {
        let a = Completion::new();
        let b = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(0);
        let dma: Dma<_> = Dma::new(&bus);
        dma.configure_interrupts(&hart);

        dma.configure_memory_to_memory(0, &copy_words(1, 0, 8), false)
            .unwrap();
        dma.start(0, 1, Some(&a)).unwrap();
        dma.configure_memory_to_memory(1, &copy_words(2, 8, 8), false)
            .unwrap();
        dma.start(1, 2, Some(&b)).unwrap();

        assert_eq!(dma.teardown(), 2);
        assert_eq!(dma.teardown(), 0);

        let outcomes = service_for(&bus, &dma, 0, 200);
        assert_eq!(outcomes, vec![TrapOutcome::Stale(1), TrapOutcome::Stale(2)]);
        assert!(!a.is_complete());
        assert!(!b.is_complete());
    }

    #[test]
    fn test_fatal_traps() {
        let bus = new_bus();
        let dma: Dma<_> = Dma::new(&bus);
        // store access fault
        assert_eq!(dma.handle_trap(7, 0), TrapOutcome::Fatal(7));
        // machine timer
        assert_eq!(
            dma.handle_trap(MCAUSE_INTERRUPT | 7, 0),
            TrapOutcome::Fatal(-7)
        );
        assert!(bus.take_faults().is_empty());
    }

    #[test]
    fn test_install_trap_vector() {
        let hart = EmulatedHart::new(0);
        install_trap_vector(&hart, 0x8000_0100);
        assert_eq!(hart.mtvec(), 0x8000_0100);
        // mode bits are forced to direct
        install_trap_vector(&hart, 0x8000_0201);
        assert_eq!(hart.mtvec(), 0x8000_0200);
    }

    #[test]
    fn test_completion_routed_to_core_1() {
        let done = Completion::new();
        let bus = new_bus();
        let hart = EmulatedHart::new(1);
        let dma: Dma<_> = Dma::new(&bus);
        dma.configure_interrupts(&hart);

        let tx = DmaTransaction {
            core: 1,
            ..copy_words(3, 0, 8)
        };
        dma.configure_memory_to_memory(4, &tx, false).unwrap();
        dma.start(4, 3, Some(&done)).unwrap();
        for _ in 0..64 {
            bus.step();
        }
        assert!(!bus.external_interrupt_pending(0));
        assert!(bus.external_interrupt_pending(1));

        assert_eq!(
            service_until(&bus, &dma, 1, &done),
            vec![TrapOutcome::Completed(3)]
        );
    }
}
