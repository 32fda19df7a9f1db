//! Section boundary predicates.
//!
//! Overlap, merging and validation all ask the same two questions about
//! neighbouring chunks. They ask them here and nowhere else.

/// Anything that belongs to a section.
pub trait Sectioned {
    /// The nearest ancestor header id, `""` at the document root.
    fn section_id(&self) -> &str;
}

/// Whether `a` and `b` belong to the same section.
///
/// Plain string equality on the section id.
#[must_use]
pub fn same_section<A, B>(a: &A, b: &B) -> bool
where
    A: Sectioned + ?Sized,
    B: Sectioned + ?Sized,
{
    a.section_id() == b.section_id()
}

/// Whether `items[index]` is the last item of its section.
///
/// True for the last item overall, or when the next item is in another
/// section. Out-of-range indexes are never section-final.
#[must_use]
pub fn is_section_final<T: Sectioned>(items: &[T], index: usize) -> bool {
    match (items.get(index), items.get(index + 1)) {
        (Some(_), None) => true,
        (Some(current), Some(next)) => !same_section(current, next),
        (None, _) => false,
    }
}

/// Whether `items[index]` is the first item of its section.
#[must_use]
pub fn opens_section<T: Sectioned>(items: &[T], index: usize) -> bool {
    match index.checked_sub(1) {
        None => !items.is_empty(),
        Some(prev) => match (items.get(prev), items.get(index)) {
            (Some(previous), Some(current)) => !same_section(previous, current),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct S(&'static str);

    impl Sectioned for S {
        fn section_id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_same_section_is_string_equality() {
        assert!(same_section(&S("h1"), &S("h1")));
        assert!(!same_section(&S("h1"), &S("H1")));
        assert!(same_section(&S(""), &S("")));
    }

    #[test]
    fn test_section_final() {
        let items = [S("a"), S("a"), S("b")];
        assert!(!is_section_final(&items, 0));
        assert!(is_section_final(&items, 1));
        assert!(is_section_final(&items, 2));
        assert!(!is_section_final(&items, 3));
    }

    #[test]
    fn test_opens_section() {
        let items = [S("a"), S("a"), S("b")];
        assert!(opens_section(&items, 0));
        assert!(!opens_section(&items, 1));
        assert!(opens_section(&items, 2));
        assert!(!opens_section(&items, 3));
        assert!(!opens_section::<S>(&[], 0));
    }
}
