use serde::{Deserialize, Serialize};
use std::fmt;

/// A value stored under a story flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FlagValue {
    /// `false`, `0` and the empty string are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FlagValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A predicate over story state, guarding a conditional scene successor.
///
/// Conditions are pure data; evaluation lives with the branch resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// The flag exists and holds exactly this value.
    FlagEquals { flag: String, value: FlagValue },
    /// The flag exists and is truthy.
    FlagSet(String),
    /// The flag holds an integer greater than or equal to `value`.
    FlagAtLeast { flag: String, value: i64 },
    /// The most recent selection for choice `choice` was the option labelled `option`.
    Chose { choice: String, option: String },
    /// The named scene has been entered at least once in this playthrough.
    Visited(String),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn flag_equals(flag: &str, value: impl Into<FlagValue>) -> Self {
        Self::FlagEquals {
            flag: flag.to_string(),
            value: value.into(),
        }
    }

    pub fn flag_set(flag: &str) -> Self {
        Self::FlagSet(flag.to_string())
    }

    pub fn chose(choice: &str, option: &str) -> Self {
        Self::Chose {
            choice: choice.to_string(),
            option: option.to_string(),
        }
    }

    /// Visit every flag name this condition reads, including nested ones.
    pub fn for_each_flag<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Self::FlagEquals { flag, .. } | Self::FlagAtLeast { flag, .. } => {
                f(flag.as_str())
            }
            Self::FlagSet(flag) => f(flag.as_str()),
            Self::Chose { .. } | Self::Visited(_) => {}
            Self::All(conds) | Self::Any(conds) => {
                for c in conds {
                    c.for_each_flag(f);
                }
            }
            Self::Not(inner) => inner.for_each_flag(f),
        }
    }

    /// Visit every `(choice, option)` pair this condition tests.
    pub fn for_each_choice<'a>(&'a self, f: &mut impl FnMut(&'a str, &'a str)) {
        match self {
            Self::Chose { choice, option } => f(choice.as_str(), option.as_str()),
            Self::All(conds) | Self::Any(conds) => {
                for c in conds {
                    c.for_each_choice(f);
                }
            }
            Self::Not(inner) => inner.for_each_choice(f),
            _ => {}
        }
    }

    /// Visit every scene name this condition tests with `Visited`.
    pub fn for_each_visited<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Self::Visited(name) => f(name.as_str()),
            Self::All(conds) | Self::Any(conds) => {
                for c in conds {
                    c.for_each_visited(f);
                }
            }
            Self::Not(inner) => inner.for_each_visited(f),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(FlagValue::Bool(true).is_truthy());
        assert!(!FlagValue::Bool(false).is_truthy());
        assert!(FlagValue::Int(-2).is_truthy());
        assert!(!FlagValue::Int(0).is_truthy());
        assert!(FlagValue::from("yes").is_truthy());
        assert!(!FlagValue::from("").is_truthy());
    }

    #[test]
    fn flag_value_display() {
        assert_eq!(FlagValue::Int(4).to_string(), "4");
        assert_eq!(FlagValue::from("sword").to_string(), "\"sword\"");
    }

    #[test]
    fn collects_nested_flags() {
        let cond = Condition::All(vec![
            Condition::flag_set("met_b"),
            Condition::Not(Box::new(Condition::FlagAtLeast {
                flag: "wounds".to_string(),
                value: 3,
            })),
            Condition::chose("duel", "fight"),
        ]);
        let mut flags = Vec::new();
        cond.for_each_flag(&mut |f| flags.push(f));
        assert_eq!(flags, vec!["met_b", "wounds"]);

        let mut choices = Vec::new();
        cond.for_each_choice(&mut |c, o| choices.push((c, o)));
        assert_eq!(choices, vec![("duel", "fight")]);

        let either = Condition::Any(vec![cond, Condition::Visited("yard".to_string())]);
        let mut visited = Vec::new();
        either.for_each_visited(&mut |name| visited.push(name));
        assert_eq!(visited, vec!["yard"]);
    }

    #[test]
    fn condition_from_ron() {
        let cond: Condition =
            ron::from_str(r#"Any([FlagEquals(flag: "mood", value: Text("angry")), Visited("yard")])"#)
                .unwrap();
        assert_eq!(
            cond,
            Condition::Any(vec![
                Condition::flag_equals("mood", "angry"),
                Condition::Visited("yard".to_string()),
            ])
        );
    }
}
