// src/utils/shuffle.rs

use rand::Rng;

/// In-place Fisher-Yates: for i from the last index down to 1, swap with a
/// uniform pick from [0, i].
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    if items.len() < 2 {
        return;
    }
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
