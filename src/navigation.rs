use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A top-level page of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Chat,
    Home,
    CallList,
    CallLog,
    ChatLog,
    Guide,
    Settings,
}

impl Page {
    /// Every page, in menu order.
    pub const ALL: [Page; 7] = [
        Page::Chat,
        Page::Home,
        Page::CallList,
        Page::CallLog,
        Page::ChatLog,
        Page::Guide,
        Page::Settings,
    ];

    pub fn all() -> &'static [Page] {
        &Self::ALL
    }

    /// The route of the page.
    pub fn path(self) -> &'static str {
        match self {
            Page::Chat => "/",
            Page::Home => "/home",
            Page::CallList => "/call_list",
            Page::CallLog => "/call_log",
            Page::ChatLog => "/chat_log",
            Page::Guide => "/guide",
            Page::Settings => "/settings",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Chat => "Chat",
            Page::Home => "Home",
            Page::CallList => "Emergency Call List",
            Page::CallLog => "Downloads",
            Page::ChatLog => "Downloaded Chats",
            Page::Guide => "First Aid Guide",
            Page::Settings => "Settings",
        }
    }

    /// A one-word name accepted by `/open`.
    pub fn slug(self) -> &'static str {
        match self {
            Page::Chat => "chat",
            Page::Home => "home",
            Page::CallList => "call_list",
            Page::CallLog => "call_log",
            Page::ChatLog => "chat_log",
            Page::Guide => "guide",
            Page::Settings => "settings",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Page {
    type Err = Error;

    /// Accepts a path, a slug or a title, ignoring case. Dashes and spaces
    /// are treated as underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let slug = wanted
            .trim_start_matches('/')
            .to_ascii_lowercase()
            .replace(['-', ' '], "_");
        Page::ALL
            .into_iter()
            .find(|page| {
                page.path() == wanted
                    || page.slug() == slug
                    || page.title().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::validation(format!("unknown page: {wanted}"), Some("page".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_unique() {
        let mut paths: Vec<&str> = Page::all().iter().map(|p| p.path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), Page::ALL.len());
    }

    #[test]
    fn parse_from_path_slug_or_title() {
        assert_eq!("/".parse::<Page>().unwrap(), Page::Chat);
        assert_eq!("/call_list".parse::<Page>().unwrap(), Page::CallList);
        assert_eq!("call-log".parse::<Page>().unwrap(), Page::CallLog);
        assert_eq!("Settings".parse::<Page>().unwrap(), Page::Settings);
        assert_eq!("first aid guide".parse::<Page>().unwrap(), Page::Guide);
        assert!("/profile".parse::<Page>().unwrap_err().is_validation());
    }

    #[test]
    fn every_page_round_trips() {
        for page in Page::all() {
            assert_eq!(page.path().parse::<Page>().unwrap(), *page);
            assert_eq!(page.slug().parse::<Page>().unwrap(), *page);
            assert_eq!(page.to_string().parse::<Page>().unwrap(), *page);
        }
    }
}
