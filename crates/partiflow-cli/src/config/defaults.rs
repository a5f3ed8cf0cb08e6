use partiflow::core::time::TimePoint;
use partiflow::engine::source::DEFAULT_TICKS_PER_FRAME;

pub struct DefaultsConfig {
    pub ticks_per_frame: TimePoint,
    pub break_on_error: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            ticks_per_frame: DEFAULT_TICKS_PER_FRAME,
            break_on_error: false,
        }
    }
}
