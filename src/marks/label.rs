//! Short labels derived from document order

/// Bijective base-26 label for a zero-based order index.
///
/// `0 -> "A"`, `25 -> "Z"`, `26 -> "AA"`, `701 -> "ZZ"`, `702 -> "AAA"`.
#[must_use]
pub fn label(index: usize) -> String {
    let mut letters = Vec::new();
    // Widened so the largest index still has a successor
    let mut n = index as u128 + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_sequence() {
        assert_eq!(label(0), "A");
        assert_eq!(label(1), "B");
        assert_eq!(label(25), "Z");
        assert_eq!(label(26), "AA");
        assert_eq!(label(27), "AB");
        assert_eq!(label(51), "AZ");
        assert_eq!(label(52), "BA");
        assert_eq!(label(701), "ZZ");
        assert_eq!(label(702), "AAA");
    }

    #[test]
    fn labels_are_unique() {
        let labels: std::collections::HashSet<String> = (0..2000).map(label).collect();
        assert_eq!(labels.len(), 2000);
    }

    #[test]
    fn largest_index_has_a_label() {
        let last = label(usize::MAX);
        assert!(!last.is_empty());
        assert!(last.bytes().all(|b| b.is_ascii_uppercase()));
        assert_ne!(last, label(usize::MAX - 1));
    }
}
