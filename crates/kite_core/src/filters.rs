//! crates/kite_core/src/filters.rs
//!
//! Sort and page parameters for list endpoints, plus the pagination summary
//! derived from a windowed row count.

use crate::domain::Metadata;
use crate::validation::Validator;

pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 1_000;

//=========================================================================================
// Sorting
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// The client-facing sort fields a listing accepts, each mapped to the
/// column it is stored in. Every field is accepted bare (ascending) and
/// with a `-` prefix (descending).
#[derive(Debug, Clone, Copy)]
pub struct SortSafeList {
    fields: &'static [(&'static str, &'static str)],
}

impl SortSafeList {
    pub const fn new(fields: &'static [(&'static str, &'static str)]) -> Self {
        Self { fields }
    }

    /// Every token this list accepts.
    pub fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        self.fields
            .iter()
            .flat_map(|(field, _)| [field.to_string(), format!("-{field}")])
    }

    fn column_for(&self, field: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
    }
}

/// A sort order that has already been checked against a [`SortSafeList`].
///
/// The only way to build one is [`SortSpec::parse`], so the column it holds
/// is always a safelisted storage column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    column: &'static str,
    direction: SortDirection,
}

impl SortSpec {
    /// Resolves `token` against `safelist`, or returns `None` if it is not listed.
    pub fn parse(token: &str, safelist: &SortSafeList) -> Option<Self> {
        let (field, direction) = match token.strip_prefix('-') {
            Some(field) => (field, SortDirection::Desc),
            None => (token, SortDirection::Asc),
        };
        safelist
            .column_for(field)
            .map(|column| SortSpec { column, direction })
    }

    /// Like [`SortSpec::parse`], recording a `sort` error on failure.
    pub fn validate(v: &mut Validator, token: &str, safelist: &SortSafeList) -> Option<Self> {
        let spec = Self::parse(token, safelist);
        v.check(spec.is_some(), "sort", "invalid sort value");
        spec
    }

    /// The storage column to order by, without any `-` prefix.
    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

//=========================================================================================
// Paging
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    page: i64,
    page_size: i64,
}

impl PageSpec {
    /// Checks both bounds, recording every violation in `v`.
    pub fn validate(v: &mut Validator, page: i64, page_size: i64) -> Option<Self> {
        v.check(page > 0, "page", "must be greater than zero");
        v.check(page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(page_size > 0, "page_size", "must be greater than zero");
        v.check(page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 1000");

        let page_ok = (1..=MAX_PAGE).contains(&page);
        let size_ok = (1..=MAX_PAGE_SIZE).contains(&page_size);
        (page_ok && size_ok).then_some(PageSpec { page, page_size })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl Metadata {
    /// Summarises a result page given the windowed total.
    pub fn calculate(total_records: i64, page: &PageSpec) -> Self {
        if total_records <= 0 {
            return Metadata::default();
        }
        Metadata {
            current_page: page.page(),
            page_size: page.page_size(),
            first_page: 1,
            last_page: (total_records + page.page_size() - 1) / page.page_size(),
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Word;

    fn page(page: i64, page_size: i64) -> PageSpec {
        let mut v = Validator::new();
        PageSpec::validate(&mut v, page, page_size).expect("valid page spec")
    }

    #[test]
    fn word_safelist_has_six_tokens() {
        let tokens: Vec<String> = Word::SORT_SAFELIST.tokens().collect();
        assert_eq!(
            tokens,
            vec!["id", "-id", "text", "-text", "difficulty", "-difficulty"]
        );
    }

    #[test]
    fn sort_remaps_client_field_to_column() {
        let asc = SortSpec::parse("text", &Word::SORT_SAFELIST).unwrap();
        assert_eq!(asc.column(), "text_value");
        assert_eq!(asc.direction(), SortDirection::Asc);

        let desc = SortSpec::parse("-difficulty", &Word::SORT_SAFELIST).unwrap();
        assert_eq!(desc.column(), "difficulty");
        assert_eq!(desc.direction().as_sql(), "DESC");
    }

    #[test]
    fn unknown_sort_tokens_are_rejected() {
        for token in [
            "",
            "-",
            "--id",
            "text_value",
            "-text_value",
            "ID",
            "id; DROP TABLE words",
            "created_at",
            "+id",
        ] {
            let mut v = Validator::new();
            assert!(SortSpec::validate(&mut v, token, &Word::SORT_SAFELIST).is_none(), "{token}");
            assert_eq!(v.errors()["sort"], "invalid sort value");
        }
    }

    #[test]
    fn page_bounds_are_inclusive() {
        assert_eq!(page(1, 1).offset(), 0);
        assert_eq!(page(MAX_PAGE, MAX_PAGE_SIZE).limit(), MAX_PAGE_SIZE);
        assert_eq!(page(3, 20).offset(), 40);
    }

    #[test]
    fn page_violations_are_collected_together() {
        let mut v = Validator::new();
        assert!(PageSpec::validate(&mut v, 0, 1001).is_none());
        assert_eq!(v.errors()["page"], "must be greater than zero");
        assert_eq!(v.errors()["page_size"], "must be a maximum of 1000");

        let mut v = Validator::new();
        assert!(PageSpec::validate(&mut v, MAX_PAGE + 1, 0).is_none());
        assert_eq!(v.errors()["page"], "must be a maximum of 10 million");
        assert_eq!(v.errors()["page_size"], "must be greater than zero");
    }

    #[test]
    fn metadata_last_page_is_ceiling() {
        for size in [1, 2, 3, 7, 20, 1000] {
            for total in 1..=250 {
                let m = Metadata::calculate(total, &page(2, size));
                assert!((m.last_page - 1) * size < total, "{total}/{size}");
                assert!(total <= m.last_page * size, "{total}/{size}");
                assert_eq!(m.first_page, 1);
                assert_eq!(m.current_page, 2);
                assert_eq!(m.page_size, size);
                assert_eq!(m.total_records, total);
            }
        }
    }

    #[test]
    fn metadata_for_no_records_is_all_zero() {
        let m = Metadata::calculate(0, &page(5, 10));
        assert!(m.is_empty());
        assert_eq!(m, Metadata::default());
    }
}
