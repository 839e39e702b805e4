use ambient_synth::{
    AudioBuffer, AudioContext, AudioGraph, AudioNode, AudioParam, BiquadFilter, BufferSource,
    ContextState, FilterType, GainNode, Oscillator, OscillatorType,
};
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Arc<AudioContext> {
        Arc::new(AudioContext::new(44100.0))
    }

    fn rms(values: &[f32]) -> f32 {
        (values.iter().map(|v| v * v).sum::<f32>() / values.len() as f32).sqrt()
    }

    #[test]
    fn test_linear_ramp() {
        let mut osc = Oscillator::new(OscillatorType::Sine);
        osc.frequency().set_value(440.0);

        println!("Initial frequency: {}", osc.frequency().get_value(0));

        // 440Hz to 880Hz over 4410 samples (0.1s)
        osc.frequency().linear_ramp_to_value_at_time(880.0, 4410);

        let check_points = [
            (0, 440.0),
            (1102, 550.0),
            (2205, 660.0),
            (3307, 770.0),
            (4410, 880.0),
        ];

        for (sample_index, expected_freq) in check_points {
            let freq = osc.frequency().get_value(sample_index);
            println!(
                "Sample {}: freq = {:.1}, expected = {:.1}",
                sample_index, freq, expected_freq
            );

            let tolerance = expected_freq * 0.01;
            assert!(
                (freq - expected_freq).abs() < tolerance,
                "Sample {}: Expected {}, got {}",
                sample_index,
                expected_freq,
                freq
            );
        }
    }

    #[test]
    fn test_ramp_from_scheduled_start() {
        let mut gain = AudioParam::new(1.0, 0.0, 10.0);
        gain.set_value_at_time(0.0, 1000);
        gain.linear_ramp_to_value_at_time(0.9, 1000 + 52920);

        let check_points = [
            (0, 1.0),
            (999, 1.0),
            (1000, 0.0),
            (1000 + 26460, 0.45),
            (1000 + 52920, 0.9),
            (200_000, 0.9),
        ];

        for (sample_index, expected) in check_points {
            let value = gain.value_at(sample_index);
            println!(
                "Sample {}: gain = {:.3}, expected = {:.3}",
                sample_index, value, expected
            );
            assert!(
                (value - expected).abs() < 0.01,
                "Sample {}: Expected {}, got {}",
                sample_index,
                expected,
                value
            );
        }
    }

    #[test]
    fn test_exponential_ramp() {
        let mut osc = Oscillator::new(OscillatorType::Sine);
        osc.frequency().set_value(440.0);
        osc.frequency().exponential_ramp_to_value_at_time(880.0, 4410);

        let check_points = [
            (0, 440.0),
            (2205, 440.0 * (2.0f32).powf(0.5)), // Geometric midpoint
            (4410, 880.0),
        ];

        for (sample_index, expected_freq) in check_points {
            let freq = osc.frequency().get_value(sample_index);
            println!(
                "Sample {}: freq = {:.1}, expected = {:.1}",
                sample_index, freq, expected_freq
            );

            let tolerance = expected_freq * 0.01;
            assert!(
                (freq - expected_freq).abs() < tolerance,
                "Sample {}: Expected {}, got {}",
                sample_index,
                expected_freq,
                freq
            );
        }
    }

    #[test]
    fn test_exponential_ramp_never_reaches_zero() {
        let mut gain = AudioParam::new(0.0, 0.0, 1.0);
        gain.set_value(0.5);
        gain.exponential_ramp_to_value_at_time(0.0, 1000);

        for sample in [0, 250, 500, 999, 1000, 5000] {
            let value = gain.value_at(sample);
            assert!(value > 0.0, "Sample {}: gain hit zero", sample);
        }
    }

    #[test]
    fn test_cancel_holds_current_value() {
        let mut gain = AudioParam::new(0.0, 0.0, 10.0);
        gain.set_value_at_time(0.0, 0);
        gain.linear_ramp_to_value_at_time(0.9, 52920);

        let now = 44100;
        let held = gain.value_at(now);
        gain.cancel_scheduled_values(now);
        gain.set_value_at_time(held, now);
        gain.linear_ramp_to_value_at_time(0.0, now + 35280);

        println!("Held gain at cancel: {:.3}", held);
        assert!((held - 0.75).abs() < 0.01);
        assert!((gain.value_at(now) - held).abs() < 1e-6);
        assert!((gain.value_at(now + 17640) - held / 2.0).abs() < 0.01);
        assert!(gain.value_at(now + 35280).abs() < 1e-6);
    }

    #[test]
    fn test_smooth_transitions() {
        let mut osc = Oscillator::new(OscillatorType::Sine);
        osc.frequency().set_value(440.0);
        osc.frequency().linear_ramp_to_value_at_time(880.0, 4410);

        let mut last_value = 440.0;

        // First 100 samples must move in small steps
        for i in 0..100 {
            let value = osc.frequency().get_value(i);
            let change = (value - last_value).abs();

            assert!(
                change < 1.0,
                "Sample {}: Too large change {} -> {} (delta: {})",
                i,
                last_value,
                value,
                change
            );

            if i % 10 == 0 {
                println!("Sample {}: value = {:.3}, change = {:.3}", i, value, change);
            }

            last_value = value;
        }
    }

    #[test]
    fn test_oscillator_output() {
        let context = setup();

        for osc_type in [
            OscillatorType::Sine,
            OscillatorType::Square,
            OscillatorType::Sawtooth,
            OscillatorType::Triangle,
        ] {
            let mut osc = Oscillator::new(osc_type);
            osc.frequency().set_value(440.0);
            osc.gain().set_value(1.0);

            let outputs: Vec<f32> = (0..200).map(|i| osc.process(&context, i)).collect();

            assert!(
                outputs.iter().any(|&x| x > 0.0),
                "{:?}: No positive samples found",
                osc_type
            );
            assert!(
                outputs.iter().any(|&x| x < 0.0),
                "{:?}: No negative samples found",
                osc_type
            );
            assert!(
                outputs.iter().all(|&x| (-1.1..=1.1).contains(&x)),
                "{:?}: Samples out of range",
                osc_type
            );
        }
    }

    #[test]
    fn test_oscillator_start_and_stop() {
        let context = setup();
        let mut osc = Oscillator::new(OscillatorType::Triangle);
        osc.start_at(100);
        osc.stop_at(200);

        assert_eq!(osc.process(&context, 50), 0.0);
        assert!(!osc.is_finished(150));
        assert!(osc.process(&context, 150).abs() > 0.0);
        assert!(osc.is_finished(200));
        assert_eq!(osc.process(&context, 250), 0.0);
    }

    #[test]
    fn test_lowpass_attenuates_high_frequencies() {
        let context = setup();
        let mut osc = Oscillator::new(OscillatorType::Sine);
        osc.frequency().set_value(8000.0);
        let mut filter =
            BiquadFilter::new(FilterType::LowPass, 300.0).with_input("osc", Box::new(osc));

        let output: Vec<f32> = (0..4410).map(|i| filter.process(&context, i)).collect();
        let level = rms(&output[2205..]);
        println!("8kHz through 300Hz low-pass: rms = {:.4}", level);
        assert!(level < 0.02, "expected strong attenuation, rms was {}", level);
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let context = setup();
        let buffer = Arc::new(AudioBuffer::new(44100.0, vec![0.5; 441]));
        let source = BufferSource::new(buffer).looping(true);
        let mut filter =
            BiquadFilter::new(FilterType::LowPass, 1000.0).with_input("dc", Box::new(source));

        let mut last = 0.0;
        for i in 0..4410 {
            last = filter.process(&context, i);
        }
        println!("DC through low-pass settles at {:.4}", last);
        assert!((last - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_bandpass_rejects_dc() {
        let context = setup();
        let buffer = Arc::new(AudioBuffer::new(44100.0, vec![0.5; 441]));
        let source = BufferSource::new(buffer).looping(true);
        let mut filter =
            BiquadFilter::new(FilterType::BandPass, 2000.0).with_input("dc", Box::new(source));

        let mut last = 1.0;
        for i in 0..8820 {
            last = filter.process(&context, i);
        }
        assert!(last.abs() < 0.01, "DC leaked through band-pass: {}", last);
    }

    #[test]
    fn test_buffer_source_one_shot_and_loop() {
        let context = setup();
        let buffer = Arc::new(AudioBuffer::new(44100.0, vec![0.1, 0.2, 0.3]));

        let mut once = BufferSource::new(buffer.clone());
        let played: Vec<f32> = (0..5).map(|i| once.process(&context, i)).collect();
        assert_eq!(played, vec![0.1, 0.2, 0.3, 0.0, 0.0]);
        assert!(once.is_finished(5));

        let mut looped = BufferSource::new(buffer).looping(true);
        looped.start_at(2);
        looped.stop_at(7);
        let played: Vec<f32> = (0..8).map(|i| looped.process(&context, i)).collect();
        assert_eq!(played, vec![0.0, 0.0, 0.1, 0.2, 0.3, 0.1, 0.2, 0.0]);
        assert!(looped.is_finished(7));
    }

    #[test]
    fn test_one_shot_gain_drains() {
        let context = setup();
        let mut osc = Oscillator::new(OscillatorType::Sine);
        osc.stop_at(64);

        let mut voice = GainNode::one_shot(1.0).with_input("osc", Box::new(osc));
        assert!(!voice.is_finished(10));
        for i in 0..256 {
            voice.process(&context, i);
        }
        assert!(voice.is_finished(256));
        assert_eq!(voice.input_count(), 0, "finished input should be pruned");

        let bus = GainNode::new(1.0);
        assert!(!bus.is_finished(256), "a plain gain never finishes");
    }

    #[test]
    fn test_noise_buffer_bounds() {
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        let mut rng = SmallRng::seed_from_u64(7);
        let noise = AudioBuffer::noise(44100.0, 2.0, 0.25, &mut rng);
        assert_eq!(noise.len(), 88200);
        assert!(noise.data().iter().all(|v| (-0.25..0.25).contains(v)));
        assert!(rms(noise.data()) > 0.1);

        let tiny = AudioBuffer::noise(44100.0, 0.0, 1.0, &mut rng);
        assert_eq!(tiny.len(), 1);
    }

    #[test]
    fn test_resampled_length() {
        let buffer = AudioBuffer::new(48000.0, (0..4800).map(|i| i as f32 / 4800.0).collect());
        let resampled = buffer.resampled(24000.0);
        assert_eq!(resampled.sample_rate(), 24000.0);
        assert_eq!(resampled.len(), 2400);
        assert!((resampled.duration() - buffer.duration()).abs() < 1e-3);
        assert!((resampled.data()[1200] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_resample_with_unusable_rates() {
        let silent_rate = AudioBuffer::new(0.0, vec![0.1; 10]);
        assert!(!silent_rate.has_valid_rate());
        assert!(!AudioBuffer::new(f32::NAN, vec![0.1]).has_valid_rate());
        assert!(!AudioBuffer::new(-44100.0, vec![0.1]).has_valid_rate());

        let kept = silent_rate.resampled(8000.0);
        assert_eq!(kept.len(), 10);
        assert_eq!(kept.sample_rate(), 8000.0);

        // a tiny positive rate would stretch ten samples over hours
        let tiny = AudioBuffer::new(1e-3, vec![0.1; 10]);
        assert!(tiny.has_valid_rate());
        let capped = tiny.resampled(100.0);
        println!("Capped resample length: {}", capped.len());
        assert_eq!(capped.len(), 60_000);
        assert!((capped.data()[30_000] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_offline_graph_clock() {
        let mut graph = AudioGraph::offline(8000.0);
        let mut block = vec![1.0; 80];

        graph.render(&mut block);
        assert_eq!(graph.context().state(), ContextState::Suspended);
        assert_eq!(graph.context().current_sample(), 0);
        assert!(block.iter().all(|v| *v == 0.0));

        graph.resume().unwrap();
        let buffer = Arc::new(AudioBuffer::new(8000.0, vec![0.5; 8]));
        graph.connect("dc", Box::new(BufferSource::new(buffer).looping(true)));
        graph.set_volume(0.5);
        graph.render(&mut block);

        assert_eq!(graph.context().current_sample(), 80);
        assert!((graph.context().current_time() - 0.01).abs() < 1e-9);
        assert!(block.iter().all(|v| (*v - 0.25).abs() < 1e-6));
        assert!(graph.is_connected("dc"));
        assert!(graph.disconnect("dc"));
        assert_eq!(graph.connection_count(), 0);
    }
}
