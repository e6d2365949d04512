//! `rands(min, max, count, seed?)`: a linear congruential
//! generator when a seed is given, otherwise non-deterministic.

use scad_value::Value;
use std::time::{SystemTime, UNIX_EPOCH};

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

struct Lcg {
    state: u32,
}

impl Lcg {
    fn new(seed: u32) -> Self {
        Lcg { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
        self.state
    }

    fn next_unit(&mut self) -> f64 {
        self.next_u32() as f64 / u32::MAX as f64
    }
}

pub fn rands(args: &[Value]) -> Value {
    let (Some(min), Some(max), Some(count)) = (
        args.first().and_then(Value::as_number),
        args.get(1).and_then(Value::as_number),
        args.get(2).and_then(Value::as_number),
    ) else {
        return Value::Undef;
    };
    let count = count.max(0.0) as usize;

    let seed = args.get(3).and_then(Value::as_number).map(|s| s as u32).unwrap_or_else(|| {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(0)
    });
    let mut lcg = Lcg::new(seed);
    let values = (0..count).map(|_| Value::Number(min + lcg.next_unit() * (max - min))).collect();
    Value::Vector(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_yields_identical_sequence() {
        let args = [Value::Number(0.0), Value::Number(1.0), Value::Number(5.0), Value::Number(42.0)];
        assert_eq!(rands(&args), rands(&args));
    }

    #[test]
    fn values_stay_within_the_requested_range() {
        let args = [Value::Number(-2.0), Value::Number(2.0), Value::Number(20.0), Value::Number(7.0)];
        let Value::Vector(values) = rands(&args) else { panic!("expected vector") };
        for v in values {
            let n = v.as_number().unwrap();
            assert!((-2.0..=2.0).contains(&n));
        }
    }
}
