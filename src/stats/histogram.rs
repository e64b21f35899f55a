use std::fmt;

use crate::{error::DbError, operator::Op};

#[derive(Debug)]
struct Bucket {
    left: i32,
    right: i32,
    count: usize,
}

impl Bucket {
    fn width(&self) -> i32 {
        self.right - self.left + 1
    }
}

/// Equi-width histogram over one integer column. Space and time per value
/// are constant; only bucket counts are kept.
pub struct IntHistogram {
    buckets: Vec<Bucket>,
    min: i32,
    width: f64,
    n_tup: usize,
}

impl IntHistogram {
    pub fn new(num_buckets: usize, min: i32, max: i32) -> IntHistogram {
        // the range is inclusive on both ends
        let width = (1.0 + max as f64 - min as f64) / num_buckets as f64;

        let mut buckets = Vec::with_capacity(num_buckets);
        for i in 0..num_buckets {
            let left = (min as f64 + i as f64 * width).ceil() as i32;
            let mut right = (min as f64 + (i as f64 + 1.0) * width).ceil() as i32 - 1;
            if right < left {
                right = left;
            }
            buckets.push(Bucket {
                left,
                right,
                count: 0,
            });
        }

        IntHistogram {
            buckets,
            min,
            width,
            n_tup: 0,
        }
    }

    fn bucket_index(&self, v: i32) -> i64 {
        ((v - self.min) as f64 / self.width).floor() as i64
    }

    pub fn add_value(&mut self, v: i32) {
        let index = self
            .bucket_index(v)
            .clamp(0, self.buckets.len() as i64 - 1) as usize;
        self.buckets[index].count += 1;
        self.n_tup += 1;
    }

    /// Estimated fraction of recorded values satisfying `value op v`.
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> Result<f64, DbError> {
        if self.n_tup == 0 {
            return Ok(0.0);
        }
        let num_buckets = self.buckets.len() as i64;
        let index = self.bucket_index(v);

        match op {
            Op::Equals => {
                if index < 0 || index >= num_buckets {
                    return Ok(0.0);
                }
                let bucket = &self.buckets[index as usize];
                Ok((bucket.count as f64 / bucket.width() as f64) / self.n_tup as f64)
            }
            Op::GreaterThan => {
                if index < 0 {
                    return Ok(1.0);
                }
                if index >= num_buckets {
                    return Ok(0.0);
                }
                let bucket = &self.buckets[index as usize];
                let mut sum =
                    bucket.count as f64 * (bucket.right - v) as f64 / bucket.width() as f64;
                for i in (index + 1) as usize..self.buckets.len() {
                    sum += self.buckets[i].count as f64;
                }
                Ok(sum / self.n_tup as f64)
            }
            Op::LessThan => {
                if index < 0 {
                    return Ok(0.0);
                }
                if index >= num_buckets {
                    return Ok(1.0);
                }
                let bucket = &self.buckets[index as usize];
                let mut sum =
                    bucket.count as f64 * (v - bucket.left) as f64 / bucket.width() as f64;
                for i in 0..index as usize {
                    sum += self.buckets[i].count as f64;
                }
                Ok(sum / self.n_tup as f64)
            }
            Op::GreaterThanOrEq => self.estimate_selectivity(Op::GreaterThan, v - 1),
            Op::LessThanOrEq => self.estimate_selectivity(Op::LessThan, v + 1),
            Op::NotEquals => Ok(1.0 - self.estimate_selectivity(Op::Equals, v)?),
            Op::Like => Err(DbError::illegal_argument(
                "like is not supported by histograms",
            )),
        }
    }

    /// Mean bucket count. A coarse signal used by join ordering heuristics.
    pub fn avg_selectivity(&self) -> f64 {
        let total: usize = self.buckets.iter().map(|b| b.count).sum();
        total as f64 / self.buckets.len() as f64
    }
}

impl fmt::Display for IntHistogram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let items: Vec<String> = self
            .buckets
            .iter()
            .map(|b| format!("<{},{}>:{}", b.left, b.right, b.count))
            .collect();
        write!(f, "|| {} ||", items.join(" || "))
    }
}

/// Folds a string into a bounded integer: the first four bytes, high byte
/// first, top bit of each masked off so the result stays non-negative.
pub(crate) fn string_to_int(s: &str) -> i32 {
    let mut v: i32 = 0;
    for (i, b) in s.bytes().take(4).enumerate() {
        v += ((b & 0x7f) as i32) << (8 * (3 - i));
    }
    v
}

/// Histogram over one string column, backed by an `IntHistogram` over the
/// folded value range.
pub struct StringHistogram {
    hist: IntHistogram,
}

impl StringHistogram {
    pub fn new(num_buckets: usize) -> StringHistogram {
        StringHistogram {
            hist: IntHistogram::new(num_buckets, string_to_int(""), string_to_int("zzzz")),
        }
    }

    pub fn add_value(&mut self, s: &str) {
        self.hist.add_value(string_to_int(s));
    }

    pub fn estimate_selectivity(&self, op: Op, s: &str) -> Result<f64, DbError> {
        self.hist.estimate_selectivity(op, string_to_int(s))
    }

    pub fn avg_selectivity(&self) -> f64 {
        self.hist.avg_selectivity()
    }
}
