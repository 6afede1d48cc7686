mod article_helpers;
mod bookmark_helpers;
mod interaction_helpers;
mod user_helpers;

pub use article_helpers::*;
pub use bookmark_helpers::*;
pub use interaction_helpers::*;
pub use user_helpers::*;

/// Builds `UPDATE ... SET a = ?, b = ?` statements from optional values.
struct QueryBuilder {
    query: String,
    params: Vec<String>,
    seperator: &'static str,
    counter: usize,
}

impl QueryBuilder {
    fn new(initial: &str, seperator: &'static str) -> Self {
        Self {
            query: initial.to_string(),
            params: vec![],
            seperator,
            counter: 0,
        }
    }

    fn add_param(mut self, column: &str, param: Option<String>) -> Self {
        if let Some(value) = param {
            if self.counter > 0 {
                self.query.push_str(self.seperator);
            }
            self.query.push_str(&format!("{column} = ?"));
            self.params.push(value);
            self.counter += 1;
        }
        self
    }

    /// Returns `None` when no column was set.
    fn build(self, suffix: &str) -> Option<(String, Vec<String>)> {
        if self.counter == 0 {
            return None;
        }
        Some((format!("{}{}", self.query, suffix), self.params))
    }
}

/// `?, ?, ?` for an `IN (...)` list of `count` values.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_skips_missing_values() {
        let (query, params) = QueryBuilder::new("UPDATE users SET ", ", ")
            .add_param("bio", Some("hello".into()))
            .add_param("avatar", None)
            .add_param("email", Some("a@b.c".into()))
            .build(" WHERE id = ?")
            .unwrap();
        assert_eq!(query, "UPDATE users SET bio = ?, email = ? WHERE id = ?");
        assert_eq!(params, vec!["hello".to_string(), "a@b.c".to_string()]);
    }

    #[test]
    fn query_builder_without_values_builds_nothing() {
        assert!(QueryBuilder::new("UPDATE users SET ", ", ")
            .add_param("bio", None)
            .build(" WHERE id = ?")
            .is_none());
    }

    #[test]
    fn placeholders_match_count() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }
}
