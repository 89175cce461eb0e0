//! Reply chunking for Discord's message size limit
//!
//! Replies longer than [`CHUNK_LIMIT`] are split on triple-backtick fences.
//! Prose between fences is windowed into fixed-width slices; code bodies get
//! over-long lines hard-wrapped and every resulting slice re-fenced on its own
//! so each message renders as a closed code block.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Fence-aware splitting with per-chunk code re-fencing
//! - 1.0.0: Line-aware chunking for embeds and messages

/// Maximum characters per delivered chunk (Discord allows 2000 per message)
pub const CHUNK_LIMIT: usize = 1900;
/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;
/// Code bodies up to `limit + CODE_SLACK` characters are sent as a single
/// block, as long as the fenced message still fits in [`MESSAGE_LIMIT`]
pub const CODE_SLACK: usize = 100;

const FENCE: &str = "```";

/// One deliverable piece of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub is_code: bool,
}

impl Chunk {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_code: false,
        }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_code: true,
        }
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Ordered chunks for a single reply
pub type ChunkPlan = Vec<Chunk>;

/// Split a reply using the Discord chunk limit
pub fn split_reply(text: &str) -> ChunkPlan {
    split_reply_with_limit(text, CHUNK_LIMIT)
}

/// Split a reply into chunks of at most `limit` characters.
///
/// Text that already fits is returned untouched as a single chunk; this is the
/// only path where fences are left as the engine wrote them.
pub fn split_reply_with_limit(text: &str, limit: usize) -> ChunkPlan {
    if char_len(text) <= limit {
        return vec![Chunk::plain(text)];
    }
    split_fenced(text, limit)
}

/// Fence-aware split, without the single-chunk short circuit.
///
/// Segments alternate prose/code by position. An unbalanced fence count keeps
/// alternating, so an unterminated block's tail is still treated as code.
pub fn split_fenced(text: &str, limit: usize) -> ChunkPlan {
    let limit = limit.max(1);
    let mut plan = Vec::new();

    for (position, segment) in text.split(FENCE).enumerate() {
        if position % 2 == 0 {
            plan.extend(window(segment, limit).into_iter().map(Chunk::plain));
        } else {
            plan.extend(fence_code_body(segment, limit));
        }
    }

    plan
}

/// Re-flow one code body and wrap each slice in its own fence
fn fence_code_body(body: &str, limit: usize) -> Vec<Chunk> {
    let reflowed = body
        .split('\n')
        .map(|line| window(line, limit).join("\n"))
        .collect::<Vec<_>>()
        .join("\n");

    if reflowed.is_empty() {
        return Vec::new();
    }

    let body_len = char_len(&reflowed);
    let fits_whole =
        body_len <= limit + CODE_SLACK && body_len + 2 * FENCE.len() <= MESSAGE_LIMIT;
    let slices = if fits_whole {
        vec![reflowed]
    } else {
        window(&reflowed, limit)
    };

    slices
        .into_iter()
        .map(|slice| Chunk::code(format!("{FENCE}{slice}{FENCE}")))
        .collect()
}

/// Consecutive slices of at most `limit` characters (never splits a char)
fn window(text: &str, limit: usize) -> Vec<String> {
    let mut slices = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == limit {
            slices.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        slices.push(text[start..].to_string());
    }

    slices
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
