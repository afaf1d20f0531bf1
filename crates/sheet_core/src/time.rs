use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Fixed-step frame clock. Wall-clock time feeds an accumulator that is drained
/// in `fixed_dt_us` slices, so animation advancement is independent of the
/// display refresh rate.
pub struct FrameClock {
    pub fixed_dt_us: u64,
    pub max_accumulator_us: u64,
    accumulator_us: u64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    last_instant: Instant,

    fps_samples: [u64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
}

impl FrameClock {
    pub fn new(fixed_dt_us: u64) -> Self {
        let fixed_dt_us = fixed_dt_us.max(1);
        Self {
            fixed_dt_us,
            max_accumulator_us: 250_000,
            accumulator_us: 0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            last_instant: Instant::now(),
            fps_samples: [fixed_dt_us; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 1_000_000.0 / fixed_dt_us as f64,
        }
    }

    /// Measure the wall-clock delta since the previous frame.
    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let real_dt_us = now.duration_since(self.last_instant).as_micros() as u64;
        self.last_instant = now;
        self.advance(real_dt_us);
    }

    /// Feed `real_dt_us` into the accumulator. Split out of `begin_frame` so
    /// callers with their own clock can drive it.
    pub fn advance(&mut self, real_dt_us: u64) {
        let mut real_dt_us = real_dt_us;
        if real_dt_us > self.max_accumulator_us {
            log::warn!(
                "Frame took {:.1}ms, capping to {}ms",
                real_dt_us as f64 / 1000.0,
                self.max_accumulator_us / 1000
            );
            real_dt_us = self.max_accumulator_us;
        }

        self.accumulator_us += real_dt_us;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = real_dt_us;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt_us = self.fps_samples.iter().sum::<u64>() as f64 / FPS_SAMPLE_COUNT as f64;
        self.smoothed_fps = if avg_dt_us > 0.0 {
            1_000_000.0 / avg_dt_us
        } else {
            0.0
        };
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator_us >= self.fixed_dt_us {
            self.accumulator_us -= self.fixed_dt_us;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(16_667)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_accumulator_in_fixed_slices() {
        let mut clock = FrameClock::new(10_000);
        clock.advance(35_000);
        let mut steps = 0;
        while clock.should_step() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(clock.steps_this_frame, 3);

        // Remainder carries into the next frame.
        clock.advance(5_000);
        assert!(clock.should_step());
        assert!(!clock.should_step());
        assert_eq!(clock.fixed_step_count, 4);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut clock = FrameClock::new(10_000);
        clock.advance(10_000_000);
        let mut steps = 0;
        while clock.should_step() {
            steps += 1;
        }
        assert_eq!(steps, 25);
    }

    #[test]
    fn smoothed_fps_tracks_frame_time() {
        let mut clock = FrameClock::new(16_667);
        for _ in 0..FPS_SAMPLE_COUNT {
            clock.advance(20_000);
        }
        assert!((clock.smoothed_fps - 50.0).abs() < 1e-6);
    }
}
