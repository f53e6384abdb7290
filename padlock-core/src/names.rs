//! Role-name normalization.
//!
//! Every role API accepts either one name or a list of names. Both forms are
//! normalized into [`RoleNames`], an ordered list of owned strings. Names are
//! case-sensitive and compared verbatim.

/// An ordered list of role names. A single name is a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleNames(Vec<String>);

impl RoleNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Conversion into [`RoleNames`].
///
/// Implemented for string types (one name) and for slices, arrays and
/// vectors of them (any of the names).
pub trait IntoRoleNames {
    fn into_role_names(self) -> RoleNames;
}

impl IntoRoleNames for RoleNames {
    fn into_role_names(self) -> RoleNames {
        self
    }
}

impl IntoRoleNames for &RoleNames {
    fn into_role_names(self) -> RoleNames {
        self.clone()
    }
}

impl IntoRoleNames for &str {
    fn into_role_names(self) -> RoleNames {
        RoleNames(vec![self.to_string()])
    }
}

impl IntoRoleNames for String {
    fn into_role_names(self) -> RoleNames {
        RoleNames(vec![self])
    }
}

impl IntoRoleNames for &String {
    fn into_role_names(self) -> RoleNames {
        RoleNames(vec![self.clone()])
    }
}

impl<S: AsRef<str>> IntoRoleNames for &[S] {
    fn into_role_names(self) -> RoleNames {
        RoleNames(self.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> IntoRoleNames for [S; N] {
    fn into_role_names(self) -> RoleNames {
        RoleNames(self.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> IntoRoleNames for &[S; N] {
    fn into_role_names(self) -> RoleNames {
        RoleNames(self.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>> IntoRoleNames for Vec<S> {
    fn into_role_names(self) -> RoleNames {
        RoleNames(self.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_name_is_singleton_list() {
        let names = "admin".into_role_names();
        assert_eq!(names.as_slice(), &["admin".to_string()]);
    }

    #[test]
    fn list_forms_normalize_equally() {
        let from_array = ["owner", "editor"].into_role_names();
        let from_vec = vec!["owner".to_string(), "editor".to_string()].into_role_names();
        let slice: &[&str] = &["owner", "editor"];
        assert_eq!(from_array, from_vec);
        assert_eq!(from_array, slice.into_role_names());
    }

    #[test]
    fn names_are_case_sensitive() {
        let names = "Admin".into_role_names();
        assert!(names.contains("Admin"));
        assert!(!names.contains("admin"));
    }
}
