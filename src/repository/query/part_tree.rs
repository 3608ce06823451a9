//! Method name parsing for derived queries.
//!
//! A derived method name has a subject, an optional predicate and an
//! optional ordering clause:
//!
//! ```text
//!   find Distinct By Name And RatingGreaterThan Or SymbolIsNull OrderBy PriceDesc
//!   ──────────────    ────────────────────────    ────────────         ─────────
//!   subject + flag    OrPart (two Parts)          OrPart               Order
//! ```
//!
//! The subject ends at the first `By` followed by an uppercase letter, so
//! properties such as `createdBy` stay intact in the predicate. Properties
//! are checked against the entity when the tree is built. The predicate is
//! kept for inspection only; execution does not evaluate it.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{DataError, DataResult};
use crate::mapping::{uncapitalize, Entity, EntityMetadata, MappingContext};

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(find|read|get|query|search|stream|count|exists|delete|remove)(\p{Lu}\w*)?$")
        .expect("valid method name regex")
});
static SUBJECT_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"By\p{Lu}").expect("valid subject regex"));
static ORDER_BY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"OrderBy\p{Lu}").expect("valid order regex"));
static ORDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\p{Lu}\w*?)(Asc|Desc)(?:\p{Lu}|$)").expect("valid order regex")
});

const IGNORE_CASE: &[&str] = &["IgnoringCase", "IgnoreCase"];
const ALL_IGNORE_CASE: &[&str] = &["AllIgnoringCase", "AllIgnoreCase"];

/// What a derived query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Find,
    Count,
    Exists,
    Delete,
}

impl Subject {
    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "count" => Subject::Count,
            "exists" => Subject::Exists,
            "delete" | "remove" => Subject::Delete,
            _ => Subject::Find,
        }
    }
}

/// Comparison applied by one predicate part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Equals,
    Not,
    IsNull,
    IsNotNull,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Between,
    Before,
    After,
    Like,
    NotLike,
    StartingWith,
    EndingWith,
    Containing,
    NotContaining,
    In,
    NotIn,
    True,
    False,
}

const KEYWORDS: &[(&str, PartKind)] = &[
    ("IsNot", PartKind::Not),
    ("Not", PartKind::Not),
    ("IsNull", PartKind::IsNull),
    ("Null", PartKind::IsNull),
    ("IsNotNull", PartKind::IsNotNull),
    ("NotNull", PartKind::IsNotNull),
    ("IsGreaterThan", PartKind::GreaterThan),
    ("GreaterThan", PartKind::GreaterThan),
    ("IsGreaterThanEqual", PartKind::GreaterThanEqual),
    ("GreaterThanEqual", PartKind::GreaterThanEqual),
    ("IsLessThan", PartKind::LessThan),
    ("LessThan", PartKind::LessThan),
    ("IsLessThanEqual", PartKind::LessThanEqual),
    ("LessThanEqual", PartKind::LessThanEqual),
    ("IsBetween", PartKind::Between),
    ("Between", PartKind::Between),
    ("IsBefore", PartKind::Before),
    ("Before", PartKind::Before),
    ("IsAfter", PartKind::After),
    ("After", PartKind::After),
    ("IsLike", PartKind::Like),
    ("Like", PartKind::Like),
    ("IsNotLike", PartKind::NotLike),
    ("NotLike", PartKind::NotLike),
    ("IsStartingWith", PartKind::StartingWith),
    ("StartingWith", PartKind::StartingWith),
    ("StartsWith", PartKind::StartingWith),
    ("IsEndingWith", PartKind::EndingWith),
    ("EndingWith", PartKind::EndingWith),
    ("EndsWith", PartKind::EndingWith),
    ("IsContaining", PartKind::Containing),
    ("Containing", PartKind::Containing),
    ("Contains", PartKind::Containing),
    ("IsNotContaining", PartKind::NotContaining),
    ("NotContaining", PartKind::NotContaining),
    ("NotContains", PartKind::NotContaining),
    ("IsIn", PartKind::In),
    ("In", PartKind::In),
    ("IsNotIn", PartKind::NotIn),
    ("NotIn", PartKind::NotIn),
    ("IsTrue", PartKind::True),
    ("True", PartKind::True),
    ("IsFalse", PartKind::False),
    ("False", PartKind::False),
    ("Is", PartKind::Equals),
    ("Equals", PartKind::Equals),
];

impl PartKind {
    /// Number of method arguments the comparison consumes.
    pub fn arity(self) -> usize {
        match self {
            PartKind::IsNull | PartKind::IsNotNull | PartKind::True | PartKind::False => 0,
            PartKind::Between => 2,
            _ => 1,
        }
    }

    /// Every `(property, kind)` reading of `part`, longest keyword first,
    /// ending with the whole text as an equality.
    fn candidates(part: &str) -> Vec<(&str, PartKind)> {
        let mut matches: Vec<(&str, &str, PartKind)> = KEYWORDS
            .iter()
            .filter_map(|(keyword, kind)| {
                part.strip_suffix(keyword)
                    .filter(|property| !property.is_empty())
                    .map(|property| (property, *keyword, *kind))
            })
            .collect();
        matches.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let mut candidates: Vec<(&str, PartKind)> =
            matches.into_iter().map(|(property, _, kind)| (property, kind)).collect();
        candidates.push((part, PartKind::Equals));
        candidates
    }
}

/// A single property comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    property: String,
    kind: PartKind,
    ignore_case: bool,
}

impl Part {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    pub fn ignores_case(&self) -> bool {
        self.ignore_case
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.property, self.kind)?;
        if self.ignore_case {
            f.write_str(" ignoring case")?;
        }
        Ok(())
    }
}

/// Parts joined by `And`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrPart {
    parts: Vec<Part>,
}

impl OrPart {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `OrderBy` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    property: String,
    direction: Direction,
}

impl Order {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Parsed form of a derived query method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTree {
    subject: Subject,
    distinct: bool,
    all_ignore_case: bool,
    predicate: Vec<OrPart>,
    order_by: Vec<Order>,
}

impl PartTree {
    /// Parse `method_name` against the entity metadata of `T`.
    ///
    /// # Errors
    /// [`DataError::InvalidArgument`] for a name that is not a derived
    /// query; a mapping error for a property `T` does not map.
    pub fn parse<T: Entity>(method_name: &str, context: &MappingContext) -> DataResult<Self> {
        let entity = context.entity::<T>()?;
        let caps = PREFIX_RE.captures(method_name).ok_or_else(|| {
            DataError::invalid_argument(format!("method {} is not a derived query", method_name))
        })?;
        let subject = Subject::from_prefix(&caps[1]);
        let rest = caps.get(2).map_or("", |m| m.as_str());

        let (subject_text, predicate_text) = match SUBJECT_END_RE.find(rest) {
            Some(m) => (&rest[..m.start()], Some(&rest[m.start() + 2..])),
            None => (rest, None),
        };
        if predicate_text.is_none() && subject_text.ends_with("By") {
            return Err(DataError::invalid_argument(format!(
                "method {} has an empty predicate",
                method_name
            )));
        }

        let mut tree = Self {
            subject,
            distinct: subject_text.contains("Distinct"),
            all_ignore_case: false,
            predicate: Vec::new(),
            order_by: Vec::new(),
        };
        if let Some(text) = predicate_text {
            tree.parse_predicate(text, &entity)?;
        }
        Ok(tree)
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn is_count(&self) -> bool {
        self.subject == Subject::Count
    }

    pub fn is_exists(&self) -> bool {
        self.subject == Subject::Exists
    }

    pub fn is_delete(&self) -> bool {
        self.subject == Subject::Delete
    }

    /// Whether `AllIgnoreCase` applied to every part.
    pub fn is_all_ignore_case(&self) -> bool {
        self.all_ignore_case
    }

    pub fn or_parts(&self) -> &[OrPart] {
        &self.predicate
    }

    /// Every part in predicate order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.predicate.iter().flat_map(|or_part| or_part.parts.iter())
    }

    pub fn order_by(&self) -> &[Order] {
        &self.order_by
    }

    /// Method arguments the predicate consumes.
    pub fn parameter_count(&self) -> usize {
        self.parts().map(|part| part.kind.arity()).sum()
    }

    fn parse_predicate<T: Entity>(
        &mut self,
        text: &str,
        entity: &EntityMetadata<T>,
    ) -> DataResult<()> {
        let mut predicate = text;
        if let Some(m) = ORDER_BY_RE.find(text) {
            predicate = &text[..m.start()];
            self.order_by = parse_order_by(&text[m.start() + "OrderBy".len()..], entity)?;
        }
        if let Some(stripped) = strip_any_suffix(predicate, ALL_IGNORE_CASE) {
            predicate = stripped;
            self.all_ignore_case = true;
        }
        if predicate.is_empty() {
            return Err(DataError::invalid_argument("empty predicate"));
        }

        let all_ignore_case = self.all_ignore_case;
        self.predicate = split_keyword(predicate, "Or")
            .into_iter()
            .map(|or_text| {
                let parts = split_keyword(or_text, "And")
                    .into_iter()
                    .map(|part_text| parse_part(part_text, all_ignore_case, entity))
                    .collect::<DataResult<Vec<_>>>()?;
                Ok(OrPart { parts })
            })
            .collect::<DataResult<Vec<_>>>()?;
        Ok(())
    }
}

fn parse_part<T: Entity>(
    text: &str,
    all_ignore_case: bool,
    entity: &EntityMetadata<T>,
) -> DataResult<Part> {
    let (text, ignore_case) = match strip_any_suffix(text, IGNORE_CASE) {
        Some(stripped) => (stripped, true),
        None => (text, all_ignore_case),
    };
    if text.is_empty() {
        return Err(DataError::invalid_argument("empty predicate part"));
    }

    let candidates = PartKind::candidates(text);
    let resolved = candidates
        .iter()
        .find(|(property, _)| entity.property(&uncapitalize(property)).is_some());
    match resolved {
        Some((property, kind)) => Ok(Part {
            property: uncapitalize(property),
            kind: *kind,
            ignore_case,
        }),
        None => {
            let (property, _) = candidates[0];
            entity.require_property(&uncapitalize(property))?;
            Err(DataError::invalid_argument(format!("cannot resolve {}", text)))
        }
    }
}

fn parse_order_by<T: Entity>(text: &str, entity: &EntityMetadata<T>) -> DataResult<Vec<Order>> {
    let mut orders = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let (property, direction, consumed) = match ORDER_RE.captures(rest) {
            Some(caps) => {
                let direction = if &caps[2] == "Desc" {
                    Direction::Desc
                } else {
                    Direction::Asc
                };
                let end = caps.get(2).map_or(rest.len(), |m| m.end());
                (caps.get(1).map_or("", |m| m.as_str()), direction, end)
            }
            None => (rest, Direction::Asc, rest.len()),
        };
        let property = uncapitalize(property);
        entity.require_property(&property)?;
        orders.push(Order {
            property,
            direction,
        });
        rest = &rest[consumed..];
    }
    Ok(orders)
}

fn strip_any_suffix<'a>(text: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| text.strip_suffix(suffix))
}

/// Split on `keyword` where it is followed by an uppercase letter, so
/// `OrderId` stays whole while `NameOrSymbol` splits.
fn split_keyword<'a>(text: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(offset) = text[search..].find(keyword) {
        let at = search + offset;
        let after = at + keyword.len();
        let boundary = at > start
            && text[after..]
                .chars()
                .next()
                .map_or(false, char::is_uppercase);
        if boundary {
            pieces.push(&text[start..at]);
            start = after;
        }
        search = after;
    }
    pieces.push(&text[start..]);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{EntityBuilder, MappingError};

    #[derive(Default)]
    struct Trade {
        id: String,
        symbol: String,
        order_id: String,
        created_by: String,
        logged_in: bool,
        price: f64,
    }

    impl Entity for Trade {
        fn describe(entity: &mut EntityBuilder<Self>) {
            entity
                .id("id", |t| &t.id, |t| &mut t.id)
                .property("symbol", |t| &t.symbol, |t| &mut t.symbol)
                .property("orderId", |t| &t.order_id, |t| &mut t.order_id)
                .property("createdBy", |t| &t.created_by, |t| &mut t.created_by)
                .property("loggedIn", |t| &t.logged_in, |t| &mut t.logged_in)
                .property("price", |t| &t.price, |t| &mut t.price);
        }
    }

    fn parse(name: &str) -> DataResult<PartTree> {
        PartTree::parse::<Trade>(name, &MappingContext::new())
    }

    fn kinds(name: &str) -> Vec<(String, PartKind)> {
        parse(name)
            .unwrap()
            .parts()
            .map(|p| (p.property().to_string(), p.kind()))
            .collect()
    }

    #[test]
    fn test_subjects() {
        assert_eq!(parse("findBySymbol").unwrap().subject(), Subject::Find);
        assert_eq!(parse("readTradeBySymbol").unwrap().subject(), Subject::Find);
        assert!(parse("countBySymbol").unwrap().is_count());
        assert!(parse("existsById").unwrap().is_exists());
        assert!(parse("removeBySymbol").unwrap().is_delete());
        assert!(parse("findDistinctBySymbol").unwrap().is_distinct());
        assert!(!parse("findBySymbol").unwrap().is_distinct());

        let all = parse("findAll").unwrap();
        assert_eq!(all.parts().count(), 0);
        assert_eq!(parse("count").unwrap().subject(), Subject::Count);
    }

    #[test]
    fn test_subject_ends_at_first_by() {
        let tree = parse("findByCreatedByAndSymbol").unwrap();
        let properties: Vec<_> = tree.parts().map(Part::property).collect();
        assert_eq!(properties, vec!["createdBy", "symbol"]);

        let tree = parse("findTradeByCreatedBy").unwrap();
        assert_eq!(tree.parts().next().unwrap().property(), "createdBy");
    }

    #[test]
    fn test_or_of_and_predicate() {
        let tree = parse("findBySymbolAndPriceGreaterThanOrOrderIdIsNull").unwrap();
        assert_eq!(tree.or_parts().len(), 2);

        let first = tree.or_parts()[0].parts();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].property(), "symbol");
        assert_eq!(first[0].kind(), PartKind::Equals);
        assert_eq!(first[1].property(), "price");
        assert_eq!(first[1].kind(), PartKind::GreaterThan);

        let second = tree.or_parts()[1].parts();
        assert_eq!(second[0].property(), "orderId");
        assert_eq!(second[0].kind(), PartKind::IsNull);

        assert_eq!(tree.parameter_count(), 2);
    }

    #[test]
    fn test_keyword_inside_property_name() {
        let tree = parse("findByOrderId").unwrap();
        assert_eq!(tree.or_parts().len(), 1);
        assert_eq!(tree.parts().next().unwrap().property(), "orderId");

        assert_eq!(kinds("findByLoggedIn"), vec![("loggedIn".to_string(), PartKind::Equals)]);
        assert_eq!(kinds("findByLoggedInTrue"), vec![("loggedIn".to_string(), PartKind::True)]);
    }

    #[test]
    fn test_longest_keyword_wins() {
        let tree = parse("findByPriceGreaterThanEqual").unwrap();
        assert_eq!(tree.parts().next().unwrap().kind(), PartKind::GreaterThanEqual);
        let tree = parse("findBySymbolIsNotNull").unwrap();
        assert_eq!(tree.parts().next().unwrap().kind(), PartKind::IsNotNull);
        assert_eq!(tree.parameter_count(), 0);
        assert_eq!(kinds("findBySymbolNotIn")[0].1, PartKind::NotIn);
        assert_eq!(kinds("findBySymbolNotLike")[0].1, PartKind::NotLike);
    }

    #[test]
    fn test_comparison_keywords() {
        let cases = [
            ("findByPriceBetween", PartKind::Between, 2),
            ("findBySymbolIn", PartKind::In, 1),
            ("findBySymbolNotIn", PartKind::NotIn, 1),
            ("findBySymbolContaining", PartKind::Containing, 1),
            ("findBySymbolContains", PartKind::Containing, 1),
            ("findBySymbolNotContaining", PartKind::NotContaining, 1),
            ("findBySymbolStartingWith", PartKind::StartingWith, 1),
            ("findBySymbolEndsWith", PartKind::EndingWith, 1),
            ("findBySymbolLike", PartKind::Like, 1),
            ("findByLoggedInIsTrue", PartKind::True, 0),
            ("findByLoggedInFalse", PartKind::False, 0),
            ("findByPriceBefore", PartKind::Before, 1),
            ("findByPriceIsAfter", PartKind::After, 1),
            ("findByPriceLessThanEqual", PartKind::LessThanEqual, 1),
            ("findBySymbolIsNot", PartKind::Not, 1),
            ("findBySymbolEquals", PartKind::Equals, 1),
        ];
        for (name, kind, arity) in cases {
            let tree = parse(name).unwrap_or_else(|err| panic!("{}: {}", name, err));
            assert_eq!(tree.parts().next().unwrap().kind(), kind, "{}", name);
            assert_eq!(tree.parameter_count(), arity, "{}", name);
        }
    }

    #[test]
    fn test_ignore_case() {
        let tree = parse("findBySymbolIgnoreCase").unwrap();
        let part = tree.parts().next().unwrap();
        assert_eq!(part.property(), "symbol");
        assert!(part.ignores_case());

        let tree = parse("findBySymbolStartingWithIgnoringCaseAndOrderId").unwrap();
        let parts: Vec<_> = tree.parts().collect();
        assert_eq!(parts[0].kind(), PartKind::StartingWith);
        assert!(parts[0].ignores_case());
        assert!(!parts[1].ignores_case());

        let tree = parse("findBySymbolAndOrderIdAllIgnoreCase").unwrap();
        assert!(tree.is_all_ignore_case());
        assert!(tree.parts().all(Part::ignores_case));
    }

    #[test]
    fn test_order_by_clause() {
        let tree = parse("findBySymbolOrderByPriceDesc").unwrap();
        assert_eq!(tree.parts().count(), 1);
        assert_eq!(tree.order_by().len(), 1);
        assert_eq!(tree.order_by()[0].property(), "price");
        assert_eq!(tree.order_by()[0].direction(), Direction::Desc);

        let tree = parse("findBySymbolOrderByPriceDescCreatedByAsc").unwrap();
        let orders: Vec<_> = tree
            .order_by()
            .iter()
            .map(|o| (o.property(), o.direction()))
            .collect();
        assert_eq!(orders, vec![("price", Direction::Desc), ("createdBy", Direction::Asc)]);

        let tree = parse("findByOrderIdOrderByPrice").unwrap();
        assert_eq!(tree.parts().next().unwrap().property(), "orderId");
        assert_eq!(tree.order_by()[0].direction(), Direction::Asc);

        assert!(matches!(
            parse("findBySymbolOrderByVolumeDesc"),
            Err(DataError::Mapping(MappingError::UnknownProperty { .. }))
        ));
    }

    #[test]
    fn test_unknown_property_rejected() {
        let err = parse("findByTrader").unwrap_err();
        assert!(matches!(
            err,
            DataError::Mapping(MappingError::UnknownProperty { ref property, .. }) if property == "trader"
        ));
    }

    #[test]
    fn test_malformed_names_rejected() {
        assert!(matches!(parse("lookupBySymbol"), Err(DataError::InvalidArgument(_))));
        assert!(matches!(parse("findBy"), Err(DataError::InvalidArgument(_))));
        assert!(matches!(
            parse("findBySymbolAndAndPrice"),
            Err(DataError::InvalidArgument(_)) | Err(DataError::Mapping(_))
        ));
    }

    #[test]
    fn test_split_keyword() {
        assert_eq!(split_keyword("NameOrSymbol", "Or"), vec!["Name", "Symbol"]);
        assert_eq!(split_keyword("OrderId", "Or"), vec!["OrderId"]);
        assert_eq!(split_keyword("ColorOrSize", "Or"), vec!["Color", "Size"]);
    }
}
