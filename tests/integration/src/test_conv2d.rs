// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{new_bus, DST, SRC};
    use dsp_config::{DspMemoryMap, WaitLimit, CONV2D_WAIT_LIMIT};
    use dsp_emulator::EmulatedBus;
    use dsp_hal::{Conv2d, Conv2dConfig, ConvError};

    const SOBEL_X: [i8; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];

    fn conv(bus: &EmulatedBus) -> Conv2d<&EmulatedBus> {
        Conv2d::new(bus, DspMemoryMap::default().conv2d_offset)
    }

    fn read_i16(bus: &EmulatedBus, addr: usize, count: usize) -> Vec<i16> {
        bus.dump_memory(addr, 2 * count)
            .chunks(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    fn config(height: u64, width: u64, kernel_size: u8) -> Conv2dConfig {
        Conv2dConfig {
            src_addr: SRC as u64,
            dest_addr: DST as u64,
            height,
            width,
            kernel_size,
            use_relu: true,
            stride: 1,
        }
    }

    #[test]
    fn test_sobel_gradient() {
        let bus = new_bus();
        // brightness rises by 10 per row and per column
        let image: Vec<u8> = (0..5)
            .flat_map(|row| (0..5).map(move |col| 10 * (row + col + 1)))
            .collect();
        bus.load_memory(SRC, &image);

        let engine = conv(&bus);
        engine
            .perform_convolution(&config(5, 5, 3), &SOBEL_X, CONV2D_WAIT_LIMIT)
            .unwrap();
        assert!(engine.is_ready());
        assert_eq!(engine.status(), 1);
        assert_eq!(read_i16(&bus, DST, 9), vec![80; 9]);
        assert!(bus.take_faults().is_empty());
    }

    #[test]
    fn test_relu_clamps_negative_response() {
        let bus = new_bus();
        let image: Vec<u8> = (0..5)
            .flat_map(|row| (0..5).map(move |col| 10 * (row + col + 1)))
            .collect();
        bus.load_memory(SRC, &image);
        let mirrored: Vec<i8> = SOBEL_X.iter().map(|t| -t).collect();

        let engine = conv(&bus);
        engine
            .perform_convolution(&config(5, 5, 3), &mirrored, CONV2D_WAIT_LIMIT)
            .unwrap();
        assert_eq!(read_i16(&bus, DST, 9), vec![0; 9]);

        let linear = Conv2dConfig {
            use_relu: false,
            ..config(5, 5, 3)
        };
        engine
            .perform_convolution(&linear, &mirrored, CONV2D_WAIT_LIMIT)
            .unwrap();
        assert_eq!(read_i16(&bus, DST, 9), vec![-80; 9]);
    }

    #[test]
    fn test_five_tap_kernel_with_stride() {
        let bus = new_bus();
        bus.load_memory(SRC, &[1; 49]);

        let strided = Conv2dConfig {
            stride: 2,
            ..config(7, 7, 5)
        };
        conv(&bus)
            .perform_convolution(&strided, &[1; 25], CONV2D_WAIT_LIMIT)
            .unwrap();
        assert_eq!(read_i16(&bus, DST, 4), vec![25; 4]);
        // nothing past the 2x2 output
        assert_eq!(read_i16(&bus, DST + 8, 1), vec![0]);
    }

    #[test]
    fn test_rejects_kernel() {
        let bus = new_bus();
        let engine = conv(&bus);
        assert_eq!(
            engine.perform_convolution(&config(5, 5, 4), &[0; 16], CONV2D_WAIT_LIMIT),
            Err(ConvError::UnsupportedKernelSize(4))
        );
        assert_eq!(
            engine.set_kernel(&SOBEL_X, 5),
            Err(ConvError::KernelTooShort { need: 25, got: 9 })
        );
        assert!(engine.is_ready());
    }

    #[test]
    fn test_stuck_engine_times_out() {
        let bus = new_bus();
        bus.set_conv2d_stuck(true);
        let engine = conv(&bus);

        let err = engine
            .perform_convolution(&config(5, 5, 3), &SOBEL_X, WaitLimit::Spins(1000))
            .unwrap_err();
        assert_eq!(err, ConvError::Timeout);
        assert_eq!(err.code(), -2);
        // forced idle so the next job can start
        assert!(engine.is_ready());

        bus.set_conv2d_stuck(false);
        bus.load_memory(SRC, &[0; 25]);
        engine
            .perform_convolution(&config(5, 5, 3), &SOBEL_X, CONV2D_WAIT_LIMIT)
            .unwrap();
    }
}
