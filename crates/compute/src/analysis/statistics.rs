pub struct Statistics;

impl Statistics {
    pub fn sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
        values.into_iter().fold(0.0, |acc, v| acc + v)
    }

    /// `part` as a percentage of `total`; zero when `total` is zero.
    pub fn percent(part: f64, total: f64) -> f64 {
        if total == 0.0 {
            return 0.0;
        }
        part / total * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::Statistics;

    #[test]
    fn sum_of_nothing_is_zero() {
        assert_eq!(Statistics::sum(Vec::<f64>::new()), 0.0);
        assert_eq!(Statistics::sum([1.5, 2.5]), 4.0);
    }

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(Statistics::percent(5.0, 0.0), 0.0);
        assert!((Statistics::percent(1.0, 4.0) - 25.0).abs() < 1e-12);
    }
}
