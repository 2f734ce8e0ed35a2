use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

/// Numeric-aware string comparison, so `"9"` sorts before `"10"`.
///
/// Digit runs compare by value, everything else compares case-insensitively.
/// Strings that are equal under those rules fall back to byte order to keep
/// the result total.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let ord = compare_digit_runs(&l_run, &r_run);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Direction of the export table's row order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut values: Vec<&str>) -> Vec<&str> {
        values.sort_by(|a, b| natural_cmp(a, b));
        values
    }

    #[test]
    fn numbers_sort_by_value() {
        assert_eq!(sorted(vec!["2", "10", "1"]), ["1", "2", "10"]);
        assert_eq!(sorted(vec!["1000", "200", "30"]), ["30", "200", "1000"]);
    }

    #[test]
    fn mixed_identifiers_compare_run_by_run() {
        assert_eq!(
            sorted(vec!["A10", "a2", "B1", "A1"]),
            ["A1", "a2", "A10", "B1"]
        );
    }

    #[test]
    fn leading_zeros_do_not_change_value_order() {
        assert_eq!(natural_cmp("007", "8"), Ordering::Less);
        assert_ne!(natural_cmp("007", "7"), Ordering::Equal);
    }

    #[test]
    fn empty_sorts_first() {
        assert_eq!(sorted(vec!["5", "", "1"]), ["", "1", "5"]);
    }

    #[test]
    fn sort_order_parses() {
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
