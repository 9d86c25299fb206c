//! The navigation bar shared by the app's pages.

use maud::{Markup, html};

use crate::endpoints;

/// A link in the navigation bar. The current page's link is highlighted.
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

/// The navigation bar shown at the top of each page behind the log-in wall.
pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// Create the navigation bar.
    ///
    /// The link matching `active_endpoint` is marked as the current page.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        let links = vec![
            Link {
                url: endpoints::DASHBOARD,
                title: "Dashboard",
                is_current: active_endpoint == endpoints::DASHBOARD,
            },
            Link {
                url: endpoints::OPERATIONS,
                title: "Operations",
                is_current: active_endpoint == endpoints::OPERATIONS,
            },
            Link {
                url: endpoints::CATEGORIES,
                title: "Categories",
                is_current: active_endpoint == endpoints::CATEGORIES,
            },
            Link {
                url: endpoints::LOG_OUT,
                title: "Log out",
                is_current: false,
            },
        ];

        NavBar { links }
    }

    /// Render the navigation bar.
    pub fn into_html(self) -> Markup {
        html! {
            nav {
                @for link in self.links {
                    a href=(link.url) class=[link.is_current.then_some("current")] {
                        (link.title)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod nav_bar_tests {
    use crate::endpoints;

    use super::NavBar;

    #[test]
    fn marks_active_endpoint_as_current() {
        let markup = NavBar::new(endpoints::OPERATIONS).into_html().into_string();

        assert!(markup.contains("class=\"current\""));
        assert!(markup.contains(endpoints::DASHBOARD));
        assert!(markup.contains(endpoints::CATEGORIES));
        assert!(markup.contains(endpoints::LOG_OUT));
    }
}
