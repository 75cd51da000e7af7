/// One way of resolving a value, tried in priority order.
pub struct Extractor<'a, T> {
    pub source: &'static str,
    extract: Box<dyn Fn() -> Option<T> + 'a>,
}

impl<'a, T> Extractor<'a, T> {
    pub fn new(source: &'static str, extract: impl Fn() -> Option<T> + 'a) -> Self {
        Self {
            source,
            extract: Box::new(extract),
        }
    }
}

/// The value accepted from a fallback chain and which extractor produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub source: &'static str,
    pub value: T,
}

/// Run extractors in order and accept the first success.
pub fn first_available<T>(chain: &[Extractor<'_, T>]) -> Option<Resolved<T>> {
    chain.iter().find_map(|extractor| {
        (extractor.extract)().map(|value| Resolved {
            source: extractor.source,
            value,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_first_success_wins_and_later_extractors_do_not_run() {
        let calls = Cell::new(0);
        let chain = [
            Extractor::new("missing", || None),
            Extractor::new("primary", || Some(7)),
            Extractor::new("never", || {
                calls.set(calls.get() + 1);
                Some(9)
            }),
        ];
        let resolved = first_available(&chain).unwrap();
        assert_eq!(resolved.source, "primary");
        assert_eq!(resolved.value, 7);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_exhausted_chain_is_none() {
        let chain: [Extractor<'_, i32>; 2] =
            [Extractor::new("a", || None), Extractor::new("b", || None)];
        assert!(first_available(&chain).is_none());
    }
}
