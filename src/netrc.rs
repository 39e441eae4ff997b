//! Minimal reader for netrc credential files.

use std::{collections::HashMap, fs, io, path::Path};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Netrc {
    machines: HashMap<String, Credentials>,
    default: Option<Credentials>,
}

impl Netrc {
    pub fn from_file(pth: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(pth)?;
        Ok(Self::parse(&text))
    }

    /// Parse netrc text. Tokens may be split across lines; unknown tokens are ignored and
    /// `macdef` bodies are skipped. Entries without both a login and a password are dropped.
    pub fn parse(text: &str) -> Self {
        let mut netrc = Netrc::default();

        // Which entry the login/password tokens currently apply to; `None` inside `default`.
        let mut current: Option<Option<String>> = None;
        let mut login = String::new();
        let mut password = String::new();

        let mut tokens = tokenize(text).into_iter();
        while let Some(token) = tokens.next() {
            match token {
                "machine" => {
                    netrc.finish_entry(current.take(), &mut login, &mut password);
                    current = tokens.next().map(|host| Some(host.to_owned()));
                }
                "default" => {
                    netrc.finish_entry(current.take(), &mut login, &mut password);
                    current = Some(None);
                }
                "login" => login = tokens.next().unwrap_or_default().to_owned(),
                "password" => password = tokens.next().unwrap_or_default().to_owned(),
                "account" | "port" => {
                    tokens.next();
                }
                "macdef" => netrc.finish_entry(current.take(), &mut login, &mut password),
                _ => {}
            }
        }
        netrc.finish_entry(current, &mut login, &mut password);

        netrc
    }

    /// Credentials for `host`, falling back to the `default` entry.
    pub fn credentials_for(&self, host: &str) -> Option<&Credentials> {
        self.machines.get(host).or(self.default.as_ref())
    }

    fn finish_entry(&mut self, entry: Option<Option<String>>, login: &mut String, password: &mut String) {
        let creds = Credentials {
            login: std::mem::take(login),
            password: std::mem::take(password),
        };

        if creds.login.is_empty() || creds.password.is_empty() {
            if let Some(host) = entry.as_ref() {
                log::debug!("Ignoring incomplete netrc entry for {:?}", host);
            }
            return;
        }

        match entry {
            Some(Some(host)) => {
                self.machines.entry(host).or_insert(creds);
            }
            Some(None) => self.default = Some(creds),
            None => {}
        }
    }
}

/// Whitespace-separated tokens of the whole file, minus `macdef` bodies.
///
/// A macro name ends its line and the body runs until the next blank line.
fn tokenize(text: &str) -> Vec<&str> {
    const VALUE_KEYWORDS: [&str; 5] = ["machine", "login", "password", "account", "port"];

    let mut tokens: Vec<&str> = vec![];
    let mut in_macro = false;

    for line in text.lines() {
        if in_macro {
            if line.trim().is_empty() {
                in_macro = false;
            }
            continue;
        }

        for word in line.split_whitespace() {
            let is_value = tokens.last().map_or(false, |prev| VALUE_KEYWORDS.contains(prev));
            tokens.push(word);
            if word == "macdef" && !is_value {
                in_macro = true;
                break;
            }
        }
    }

    tokens
}
