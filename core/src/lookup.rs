//! Filter-based lookups over repeated, possibly absent, tagged collections.
//!
//! Lookups are OR-ed across filters: an item is returned if it satisfies any
//! filter, in collection order, and at most once. An absent collection is an
//! empty one.

/// A predicate over collection items.
pub trait Filter<T: ?Sized> {
    /// Returns `true` if `item` satisfies this filter.
    fn matches(&self, item: &T) -> bool;
}

impl<T: ?Sized, F> Filter<T> for F
where
    F: Fn(&T) -> bool,
{
    fn matches(&self, item: &T) -> bool {
        self(item)
    }
}

/// An item identified by a system/value pair, such as an identifier or a coding.
pub trait SystemTagged {
    /// Namespace the value belongs to.
    fn system(&self) -> Option<&str>;

    /// Value within the system.
    fn value(&self) -> Option<&str>;
}

/// Matches [`SystemTagged`] items on whichever sub-fields are set.
///
/// An unset sub-field is a wildcard, so `TagFilter::default()` matches
/// every item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    system: Option<String>,
    value: Option<String>,
}

impl TagFilter {
    /// A filter on the system only.
    pub fn system(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            value: None,
        }
    }

    /// A filter on the value only.
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            system: None,
            value: Some(value.into()),
        }
    }

    /// Additionally requires `value`.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Additionally requires `system`.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

impl<T: SystemTagged + ?Sized> Filter<T> for TagFilter {
    fn matches(&self, item: &T) -> bool {
        fn field_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
            wanted.is_none_or(|wanted| actual == Some(wanted))
        }
        field_matches(self.system.as_deref(), item.system())
            && field_matches(self.value.as_deref(), item.value())
    }
}

/// Lookup helpers for any view of a repeated collection.
///
/// # Examples
///
/// ```
/// use record_codec_core::{SystemTagged, TagFilter, TaggedCollection};
///
/// struct Id(&'static str, &'static str);
///
/// impl SystemTagged for Id {
///     fn system(&self) -> Option<&str> {
///         Some(self.0)
///     }
///     fn value(&self) -> Option<&str> {
///         Some(self.1)
///     }
/// }
///
/// let ids = Some(vec![Id("A", "1"), Id("B", "2")]);
/// assert_eq!(ids.values_matching(&[TagFilter::system("B")]), vec!["2"]);
///
/// let missing: Option<Vec<Id>> = None;
/// assert!(missing.find_first(&[TagFilter::system("A")]).is_none());
/// ```
pub trait TaggedCollection {
    /// Item type of the collection.
    type Item;

    /// The items, empty if the collection is absent.
    fn items(&self) -> &[Self::Item];

    /// Every item satisfying any of `filters`, in collection order.
    fn find_all<F: Filter<Self::Item>>(&self, filters: &[F]) -> Vec<&Self::Item> {
        self.items()
            .iter()
            .filter(|item| filters.iter().any(|filter| filter.matches(item)))
            .collect()
    }

    /// The earliest item satisfying any of `filters`.
    fn find_first<F: Filter<Self::Item>>(&self, filters: &[F]) -> Option<&Self::Item> {
        self.items()
            .iter()
            .find(|item| filters.iter().any(|filter| filter.matches(item)))
    }

    /// Values of the items [`find_all`](Self::find_all) returns; items
    /// without a value are skipped.
    fn values_matching<F: Filter<Self::Item>>(&self, filters: &[F]) -> Vec<&str>
    where
        Self::Item: SystemTagged,
    {
        self.find_all(filters)
            .into_iter()
            .filter_map(|item| item.value())
            .collect()
    }
}

impl<T> TaggedCollection for [T] {
    type Item = T;

    fn items(&self) -> &[T] {
        self
    }
}

impl<T> TaggedCollection for Vec<T> {
    type Item = T;

    fn items(&self) -> &[T] {
        self
    }
}

impl<T> TaggedCollection for Option<Vec<T>> {
    type Item = T;

    fn items(&self) -> &[T] {
        self.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tag {
        system: Option<&'static str>,
        value: Option<&'static str>,
    }

    impl SystemTagged for Tag {
        fn system(&self) -> Option<&str> {
            self.system
        }

        fn value(&self) -> Option<&str> {
            self.value
        }
    }

    fn tag(system: &'static str, value: &'static str) -> Tag {
        Tag {
            system: Some(system),
            value: Some(value),
        }
    }

    fn collection() -> Option<Vec<Tag>> {
        Some(vec![tag("A", "1"), tag("B", "2")])
    }

    #[test]
    fn test_single_filter() {
        assert_eq!(
            collection().values_matching(&[TagFilter::system("B")]),
            vec!["2"]
        );
    }

    #[test]
    fn test_filters_are_ored_in_collection_order() {
        assert_eq!(
            collection().values_matching(&[TagFilter::system("B"), TagFilter::system("A")]),
            vec!["1", "2"]
        );
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(collection().find_all(&[TagFilter::system("Z")]).is_empty());
        assert!(collection().find_first(&[TagFilter::system("Z")]).is_none());
    }

    #[test]
    fn test_item_matching_several_filters_appears_once() {
        let filters = [TagFilter::system("A"), TagFilter::value("1")];
        assert_eq!(collection().find_all(&filters), vec![&tag("A", "1")]);
    }

    #[test]
    fn test_absent_collection_is_empty() {
        let absent: Option<Vec<Tag>> = None;
        assert!(absent.find_all(&[TagFilter::system("A")]).is_empty());
        assert!(absent.find_first(&[TagFilter::system("A")]).is_none());
    }

    #[test]
    fn test_unset_sub_fields_are_wildcards() {
        let items = vec![tag("A", "1"), tag("A", "2"), tag("B", "2")];
        assert_eq!(
            items.values_matching(&[TagFilter::system("A").with_value("2")]),
            vec!["2"]
        );
        assert_eq!(items.find_all(&[TagFilter::value("2")]).len(), 2);
        assert_eq!(items.find_all(&[TagFilter::default()]).len(), 3);
    }

    #[test]
    fn test_item_missing_sub_field_does_not_match_set_filter() {
        let items = [Tag {
            system: None,
            value: Some("1"),
        }];
        assert!(items[..].find_first(&[TagFilter::system("A")]).is_none());
        assert!(items[..].find_first(&[TagFilter::value("1")]).is_some());
    }

    #[test]
    fn test_find_first_is_earliest_in_collection_order() {
        let items = vec![tag("A", "1"), tag("B", "2"), tag("A", "3")];
        let first = items.find_first(&[TagFilter::system("B"), TagFilter::system("A")]);
        assert_eq!(first, Some(&tag("A", "1")));
    }

    #[test]
    fn test_closure_filter() {
        let items = vec![tag("A", "1"), tag("B", "22")];
        let long = |item: &Tag| item.value.is_some_and(|v| v.len() > 1);
        assert_eq!(items.values_matching(&[long]), vec!["22"]);
    }
}
