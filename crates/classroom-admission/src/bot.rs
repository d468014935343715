//! User-agent based bot detection.
//!
//! Search-engine crawlers and link-preview fetchers are let through; scripted
//! HTTP clients, scrapers and headless browsers are not. A request without a
//! user agent is treated as automated.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Browser,
    /// Crawler or preview bot that is welcome.
    AllowedBot,
    Automated,
}

const ALLOWED_BOTS: &[&str] = &[
    "googlebot",
    "bingbot",
    "duckduckbot",
    "yandexbot",
    "baiduspider",
    "applebot",
    "slurp",
    "slackbot",
    "twitterbot",
    "facebookexternalhit",
    "linkedinbot",
    "discordbot",
    "telegrambot",
    "whatsapp",
];

const AUTOMATED_SIGNATURES: &[&str] = &[
    "curl/",
    "wget/",
    "httpie/",
    "python-requests",
    "python-urllib",
    "python-httpx",
    "aiohttp",
    "go-http-client",
    "java/",
    "okhttp",
    "apache-httpclient",
    "libwww-perl",
    "node-fetch",
    "axios/",
    "undici",
    "postmanruntime",
    "insomnia",
    "scrapy",
    "headlesschrome",
    "phantomjs",
    "selenium",
    "puppeteer",
    "playwright",
    "crawler",
    "spider",
    "bot",
];

pub fn classify(user_agent: Option<&str>) -> ClientKind {
    let Some(ua) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
        return ClientKind::Automated;
    };
    let ua = ua.to_ascii_lowercase();

    if ALLOWED_BOTS.iter().any(|sig| ua.contains(sig)) {
        return ClientKind::AllowedBot;
    }
    if AUTOMATED_SIGNATURES.iter().any(|sig| ua.contains(sig)) {
        return ClientKind::Automated;
    }
    ClientKind::Browser
}

pub fn is_automated(user_agent: Option<&str>) -> bool {
    classify(user_agent) == ClientKind::Automated
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIREFOX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

    #[test]
    fn test_browser_is_not_automated() {
        assert_eq!(classify(Some(FIREFOX)), ClientKind::Browser);
        assert!(!is_automated(Some(FIREFOX)));
    }

    #[test]
    fn test_missing_user_agent_is_automated() {
        assert!(is_automated(None));
        assert!(is_automated(Some("   ")));
    }

    #[test]
    fn test_scripted_clients_are_automated() {
        assert!(is_automated(Some("curl/8.5.0")));
        assert!(is_automated(Some("python-requests/2.31.0")));
        assert!(is_automated(Some("Go-http-client/1.1")));
        assert!(is_automated(Some(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 HeadlessChrome/120.0 Safari/537.36"
        )));
    }

    #[test]
    fn test_search_engines_are_allowed() {
        assert_eq!(
            classify(Some(
                "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
            )),
            ClientKind::AllowedBot
        );
        assert!(!is_automated(Some("Slackbot-LinkExpanding 1.0")));
    }
}
