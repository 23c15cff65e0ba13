/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time(pub i64); // milliseconds since the Unix epoch

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: Time,
    pub end: Time,
}

impl TimeSpan {
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, t: Time) -> bool {
        t >= self.start && t <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::{Time, TimeSpan};

    #[test]
    fn contains_is_inclusive() {
        let span = TimeSpan::new(Time(10), Time(20));
        assert!(span.contains(Time(10)));
        assert!(span.contains(Time(20)));
        assert!(!span.contains(Time(9)));
        assert!(!span.contains(Time(21)));
    }
}
