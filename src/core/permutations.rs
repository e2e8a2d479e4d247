/// Lazy, restartable enumeration of every ordering of a slice
///
/// Orderings come out in lexicographic order of element *positions*: the
/// first one is the input order, the last its reverse. This fixes which of
/// two equally scored rankings counts as "encountered first".
#[derive(Debug, Clone)]
pub struct Permutations<'a, T> {
    items: &'a [T],
    indices: Vec<usize>,
    done: bool,
}

impl<'a, T: Clone> Permutations<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            indices: (0..items.len()).collect(),
            done: false,
        }
    }

    /// Start the enumeration over from the input order
    pub fn restart(&mut self) {
        self.indices = (0..self.items.len()).collect();
        self.done = false;
    }

    /// Advance `indices` to the next lexicographic permutation in place
    fn advance(&mut self) -> bool {
        let n = self.indices.len();
        if n < 2 {
            return false;
        }

        // Longest non-increasing suffix
        let mut i = n - 1;
        while i > 0 && self.indices[i - 1] >= self.indices[i] {
            i -= 1;
        }
        if i == 0 {
            return false;
        }

        let mut j = n - 1;
        while self.indices[j] <= self.indices[i - 1] {
            j -= 1;
        }
        self.indices.swap(i - 1, j);
        self.indices[i..].reverse();
        true
    }
}

impl<'a, T: Clone> Iterator for Permutations<'a, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = self
            .indices
            .iter()
            .map(|&i| self.items[i].clone())
            .collect();

        if !self.advance() {
            self.done = true;
        }

        Some(current)
    }
}

/// n! as u64, saturating
pub fn factorial(n: usize) -> u64 {
    (1..=n as u64).fold(1u64, |acc, k| acc.saturating_mul(k))
}
