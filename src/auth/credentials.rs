//! `user:pass,user:pass` credential lists

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Parsed list of credentials from `ADMINS` or `USERS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialList {
    entries: Vec<Credential>,
}

impl CredentialList {
    /// Parse a comma-separated list, skipping entries without both parts
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .filter_map(|entry| {
                let (username, password) = entry.trim().split_once(':')?;
                if username.is_empty() || password.is_empty() {
                    return None;
                }
                Some(Credential {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.entries.iter()
    }

    pub fn find_by_password(&self, password: &str) -> Option<&Credential> {
        self.entries.iter().find(|c| c.password == password)
    }
}
