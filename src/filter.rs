/*!
 * Heuristic comment filters.
 *
 * Every predicate works on the plain text of a comment. A comment is dropped
 * when any enabled rule matches; dropping a top-level comment drops its
 * replies with it.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::comments::Comment;

/// Independent toggles for the three filter rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Drop comments made only of emoji, symbols and punctuation
    #[serde(default = "default_true")]
    pub exclude_emoji_only: bool,

    /// Drop self-promotion and spam
    #[serde(default = "default_true")]
    pub exclude_advertisements: bool,

    /// Drop low-content comments ("first", "nice video")
    #[serde(default)]
    pub exclude_generic: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            exclude_emoji_only: true,
            exclude_advertisements: true,
            exclude_generic: false,
        }
    }
}

impl FilterOptions {
    /// Options with every rule disabled
    pub fn none() -> Self {
        Self {
            exclude_emoji_only: false,
            exclude_advertisements: false,
            exclude_generic: false,
        }
    }

    /// Options with every rule enabled
    pub fn all() -> Self {
        Self {
            exclude_emoji_only: true,
            exclude_advertisements: true,
            exclude_generic: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Which rule removed a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    EmojiOnly,
    Advertisement,
    Generic,
}

/// Counts of removed comments per rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub examined: usize,
    pub kept: usize,
    pub emoji_only: usize,
    pub advertisement: usize,
    pub generic: usize,
    /// Replies removed because their parent was removed
    pub dropped_with_parent: usize,
}

impl FilterStats {
    fn record(&mut self, reason: FilterReason) {
        match reason {
            FilterReason::EmojiOnly => self.emoji_only += 1,
            FilterReason::Advertisement => self.advertisement += 1,
            FilterReason::Generic => self.generic += 1,
        }
    }

    /// Total comments removed
    pub fn removed(&self) -> usize {
        self.examined - self.kept
    }
}

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(https?://|www\.)\S+|\b[a-z0-9-]+\.(com|net|org|io|ly|me|gg|shop|store|xyz|link)(/\S*)?\b")
        .expect("valid url regex")
});

static PROMOTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(",
        r"sub(scribe)?\s*(to\s+)?my\s+channel|check\s+(out\s+)?my\s+(channel|video|profile|page)",
        r"|visit\s+my\s+(channel|page|profile)|my\s+new\s+video|sub\s*4\s*sub|follow\s+me\s+on",
        r"|promo\s*code|discount\s+code|coupon|use\s+code|giveaway|free\s+gift",
        r"|telegram|whatsapp|wa\.me|t\.me|dm\s+me|inbox\s+me|contact\s+me",
        r"|earn\s+\$?\d+|make\s+money|passive\s+income|crypto\s+(signals?|investment)|bitcoin\s+invest",
        r"|forex|binary\s+options",
        r")\b",
    ))
    .expect("valid promotion regex")
});

/// International numbers need a `+` and 8 to 15 digits; local ones need 3-3-4 grouping
static PHONE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\+\d{1,3}(?:[\s.-]?\d){7,12}\b",
        r"|(?:\(\d{3}\)\s?|\b\d{3}[\s.-])\d{3}[\s.-]\d{4}\b",
    ))
    .expect("valid phone regex")
});

static GENERIC_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(",
        r"first|second|third|early|here before|who('s| is) here|anyone here",
        r"|nice|cool|wow|great|awesome|amazing|good|love( it| this)?|i love (it|this)",
        r"|nice video|great video|good video|cool video|awesome video|amazing video|love (this|the) video",
        r"|lol|lmao|haha+|hehe+|xd|omg|ok|okay|yes|no|yeah|true|same|this|facts",
        r"|thanks|thank you|thx|ty|hi|hello|hey|bro|fire|w|l|goat|legend",
        r")[\s\p{P}\p{S}\p{M}\p{Cf}]*$",
    ))
    .expect("valid generic phrase regex")
});

/// Text consisting only of emoji, symbols, punctuation and whitespace
pub fn is_emoji_only(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && !trimmed.chars().any(char::is_alphanumeric)
}

/// Self-promotion, external links, contact handles and money spam
pub fn is_advertisement(text: &str) -> bool {
    URL.is_match(text) || PROMOTION.is_match(text) || PHONE_NUMBER.is_match(text)
}

/// Low-content comments: fewer than three letters or digits, or a stock phrase
pub fn is_generic(text: &str) -> bool {
    let trimmed = text.trim();
    let meaningful = trimmed.chars().filter(|c| c.is_alphanumeric()).count();
    if meaningful < 3 {
        return true;
    }
    GENERIC_PHRASE.is_match(trimmed)
}

/// First enabled rule matching the comment, if any
pub fn filter_reason(comment: &Comment, options: &FilterOptions) -> Option<FilterReason> {
    let text = comment.plain_text();

    if options.exclude_emoji_only && is_emoji_only(&text) {
        return Some(FilterReason::EmojiOnly);
    }
    if options.exclude_advertisements && is_advertisement(&text) {
        return Some(FilterReason::Advertisement);
    }
    if options.exclude_generic && is_generic(&text) {
        return Some(FilterReason::Generic);
    }
    None
}

/// Keep unless any enabled rule matches
pub fn should_keep(comment: &Comment, options: &FilterOptions) -> bool {
    filter_reason(comment, options).is_none()
}

/// Filter threads recursively, returning the retained threads.
///
/// Replies of kept parents are filtered with the same options and every
/// parent's `reply_count` is reset to the length of its retained replies.
pub fn apply_filters(threads: Vec<Comment>, options: &FilterOptions) -> Vec<Comment> {
    apply_filters_with_stats(threads, options).0
}

/// Same as [`apply_filters`], also reporting what was removed
pub fn apply_filters_with_stats(threads: Vec<Comment>, options: &FilterOptions) -> (Vec<Comment>, FilterStats) {
    let mut stats = FilterStats::default();
    let mut kept = Vec::with_capacity(threads.len());

    for mut thread in threads {
        stats.examined += 1;

        if let Some(reason) = filter_reason(&thread, options) {
            debug!("Dropping comment {} ({:?}) with {} replies", thread.id, reason, thread.replies.len());
            stats.record(reason);
            stats.examined += thread.replies.len();
            stats.dropped_with_parent += thread.replies.len();
            continue;
        }
        stats.kept += 1;

        let replies = std::mem::take(&mut thread.replies);
        let mut kept_replies = Vec::with_capacity(replies.len());
        for reply in replies {
            stats.examined += 1;
            match filter_reason(&reply, options) {
                Some(reason) => stats.record(reason),
                None => {
                    stats.kept += 1;
                    kept_replies.push(reply);
                }
            }
        }

        thread.reply_count = kept_replies.len();
        thread.replies = kept_replies;
        kept.push(thread);
    }

    (kept, stats)
}
