//! Two-stage stratified train / validation / test partition.
//!
//! Stage one holds out the test set, stage two takes the validation set from
//! what is left and the rest becomes training data. Each stage allocates its
//! quota across classes by largest remainder, so every split mirrors the
//! global class ratio to within one example per class. All randomness comes from one seeded [`StdRng`].

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::config::SplitFractions;
use crate::corpus::{Label, RawReview};
use crate::encode::EncodedExample;
use crate::error::ConfigError;
use crate::tokenize::CleanedReview;

/// Anything carrying a class label the splitter can stratify on.
pub trait Labelled {
    fn label(&self) -> Label;
}

impl Labelled for RawReview {
    fn label(&self) -> Label {
        RawReview::label(self)
    }
}

impl Labelled for CleanedReview {
    fn label(&self) -> Label {
        self.label
    }
}

impl Labelled for EncodedExample {
    fn label(&self) -> Label {
        self.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

impl<T> Split<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(name, examples)` for each part, in train / val / test order.
    pub fn parts(&self) -> [(&'static str, &[T]); 3] {
        [
            ("train", self.train.as_slice()),
            ("val", self.val.as_slice()),
            ("test", self.test.as_slice()),
        ]
    }
}

/// Fraction of positive examples, `0.0` for an empty slice.
pub fn positive_ratio<T: Labelled>(examples: &[T]) -> f64 {
    if examples.is_empty() {
        return 0.0;
    }
    let positive = examples
        .iter()
        .filter(|e| e.label() == Label::Positive)
        .count();
    positive as f64 / examples.len() as f64
}

/// Partition `examples`. Identical input and seed give an identical result.
pub fn split<T: Labelled>(
    examples: Vec<T>,
    fractions: &SplitFractions,
    seed: u64,
) -> Result<Split<T>, ConfigError> {
    fractions.validate()?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut classes: [Vec<T>; 2] = [Vec::new(), Vec::new()];
    for example in examples {
        classes[example.label() as usize].push(example);
    }
    for class in &mut classes {
        class.shuffle(&mut rng);
    }

    let total: usize = classes.iter().map(Vec::len).sum();
    let test_target = ((total as f64) * fractions.test).round() as usize;
    let mut test = take_stratified(&mut classes, test_target.min(total));

    let remaining: usize = classes.iter().map(Vec::len).sum();
    let val_target = ((total as f64) * fractions.val).round() as usize;
    let mut val = take_stratified(&mut classes, val_target.min(remaining));

    let [negative, positive] = classes;
    let mut train = negative;
    train.extend(positive);

    train.shuffle(&mut rng);
    val.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok(Split { train, val, test })
}

/// Remove `target` examples from the ends of `classes`, each class giving up
/// its proportional share.
fn take_stratified<T>(classes: &mut [Vec<T>; 2], target: usize) -> Vec<T> {
    let sizes = [classes[0].len(), classes[1].len()];
    let quotas = allocate(target, &sizes);
    let mut taken = Vec::with_capacity(target);
    for (class, quota) in classes.iter_mut().zip(quotas) {
        let keep = class.len() - quota;
        taken.extend(class.drain(keep..));
    }
    taken
}

/// Largest-remainder apportionment of `target` across `sizes`. Ties go to the
/// earlier class. Requires `target <= sizes.sum()`.
fn allocate<const N: usize>(target: usize, sizes: &[usize; N]) -> [usize; N] {
    let total: usize = sizes.iter().sum();
    let mut quotas = [0; N];
    if total == 0 {
        return quotas;
    }
    let mut remainders = [(0usize, 0usize); N];
    for (i, &size) in sizes.iter().enumerate() {
        let exact = target * size;
        quotas[i] = exact / total;
        remainders[i] = (exact % total, i);
    }
    let mut left = target - quotas.iter().sum::<usize>();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter() {
        if left == 0 {
            break;
        }
        if quotas[i] < sizes[i] {
            quotas[i] += 1;
            left -= 1;
        }
    }
    quotas
}
