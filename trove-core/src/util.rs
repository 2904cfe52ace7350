use std::any;

/// Appends each value through `f`, writing `separator` between the ones that produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let start = out.len();
    for v in values {
        let before = out.len();
        if before > start {
            out.push_str(separator);
        }
        let mark = out.len();
        f(out, v);
        if out.len() == mark {
            out.truncate(before);
        }
    }
}

/// Last path segment of a type name, without generic arguments: `app::model::Document` becomes `Document`.
pub fn simple_name<T: ?Sized>() -> &'static str {
    let name = any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

/// Table name derived from a type name: the simple name with a trailing "s" unless it already ends with one.
pub fn pluralize(name: &str) -> String {
    if name.ends_with('s') {
        name.to_string()
    } else {
        format!("{}s", name)
    }
}

/// Shortens long SQL or values for logs and error messages.
#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {{
        let query: &str = &$query;
        let end = (0..=::std::cmp::min(query.len(), 497))
            .rev()
            .find(|i| query.is_char_boundary(*i))
            .unwrap_or(0);
        format!(
            "{}{}",
            query[..end].trim_end(),
            if query.len() > end { "..." } else { "" },
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    mod model {
        pub struct Document;
        pub struct Address;
        pub struct Wrapper<T>(pub T);
    }

    #[test]
    fn simple_names() {
        assert_eq!(simple_name::<model::Document>(), "Document");
        assert_eq!(simple_name::<model::Wrapper<model::Address>>(), "Wrapper");
        assert_eq!(simple_name::<i32>(), "i32");
    }

    #[test]
    fn table_names() {
        assert_eq!(pluralize("Document"), "Documents");
        assert_eq!(pluralize("Address"), "Address");
        assert_eq!(pluralize("DocType"), "DocTypes");
    }

    #[test]
    fn separated() {
        let mut out = String::from("SELECT ");
        separated_by(&mut out, ["a", "", "b"], |out, v| out.push_str(v), ", ");
        assert_eq!(out, "SELECT a, b");
        let mut out = String::from("WHERE ");
        separated_by(
            &mut out,
            ["title = ?", "", ""],
            |out, v| out.push_str(v),
            " AND ",
        );
        assert_eq!(out, "WHERE title = ?");
        let mut out = String::new();
        separated_by(&mut out, ["", "a", ""], |out, v| out.push_str(v), ", ");
        assert_eq!(out, "a");
    }

    #[test]
    fn truncated() {
        let long = "é".repeat(400);
        let short = truncate_long!(long);
        assert!(short.ends_with("..."));
        assert!(short.len() <= 500);
        assert_eq!(truncate_long!("SELECT 1"), "SELECT 1");
    }
}
