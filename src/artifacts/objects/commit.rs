//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! The revision walk only needs their headers:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! Body as stored in a pack (no `commit <size>\0` prefix):
//! ```text
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;

/// Author or committer information
///
/// Contains name, email, and timestamp with timezone information.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    /// Create a new author with a specific timestamp
    ///
    /// # Arguments
    ///
    /// * `name` - Author's name
    /// * `email` - Author's email address
    /// * `timestamp` - Specific timestamp with timezone
    pub fn new(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    /// Create an author from seconds since the epoch, in UTC
    pub fn at_epoch_seconds(name: &str, email: &str, seconds: i64) -> anyhow::Result<Self> {
        let timestamp = chrono::DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid timestamp {seconds}"))?
            .fixed_offset();

        Ok(Author::new(name.to_string(), email.to_string(), timestamp))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Format author name and email for display
    ///
    /// # Returns
    ///
    /// String in format "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Format complete author info including timestamp
    ///
    /// # Returns
    ///
    /// String in format "Name <email> timestamp timezone"
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Format: "name <email> timestamp timezone"
        // Split from right to get timezone and timestamp first
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(anyhow::anyhow!("Invalid author format"));
        }

        let timezone = parts[0];
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Invalid timestamp"))?;
        let name_email_part = parts[2];

        let email_start = name_email_part
            .find('<')
            .ok_or_else(|| anyhow::anyhow!("Invalid author format: missing '<'"))?;
        let email_end = name_email_part
            .rfind('>')
            .ok_or_else(|| anyhow::anyhow!("Invalid author format: missing '>'"))?;
        if email_end < email_start {
            return Err(anyhow::anyhow!("Invalid author format: misplaced '>'"));
        }

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        let offset = parse_timezone(timezone)?;
        let datetime = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?
            .with_timezone(&offset);

        Ok(Author {
            name,
            email,
            timestamp: datetime,
        })
    }
}

/// Parse a `+hhmm` / `-hhmm` timezone suffix
fn parse_timezone(timezone: &str) -> anyhow::Result<chrono::FixedOffset> {
    let invalid = || anyhow::anyhow!("Invalid timezone {timezone}");

    let (sign, digits) = match timezone.split_at_checked(1) {
        Some(("+", digits)) => (1, digits),
        Some(("-", digits)) => (-1, digits),
        _ => return Err(invalid()),
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = digits[2..].parse()?;

    chrono::FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Decode commit text as UTF-8, or as Latin-1 when the commit declares it
fn decode_text(bytes: &[u8], encoding: Option<&str>) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) if encoding.is_some_and(is_latin1) => bytes.iter().map(|&byte| byte as char).collect(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn is_latin1(encoding: &str) -> bool {
    matches!(
        encoding.to_ascii_lowercase().as_str(),
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1"
    )
}

/// Git commit object
///
/// Carries its own id so that walk output can be reported without re-hashing.
/// Commit time, which orders the walk, is the committer timestamp.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    oid: ObjectId,
    /// Parent commit IDs (empty for initial commit, multiple for merge commits)
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    pub fn new(
        oid: ObjectId,
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        committer: Author,
        message: String,
    ) -> Self {
        Commit {
            oid,
            parents,
            tree_oid,
            author,
            committer,
            message,
        }
    }

    /// Parse a commit body read from storage under the given id
    ///
    /// Text need not be UTF-8: an `encoding` header naming Latin-1 is honoured,
    /// anything else undecodable is replaced with U+FFFD.
    pub fn parse(oid: ObjectId, content: &[u8]) -> anyhow::Result<Self> {
        let (headers, message) = match content.windows(2).position(|pair| pair == b"\n\n") {
            Some(split) => (&content[..split], &content[split + 2..]),
            None => (content, &[][..]),
        };
        let encoding = headers
            .split(|&byte| byte == b'\n')
            .find_map(|line| line.strip_prefix(b"encoding "))
            .and_then(|name| std::str::from_utf8(name).ok());

        let headers = decode_text(headers, encoding);
        let mut lines = headers.lines();

        let tree_line = lines
            .next()
            .context("Invalid commit object: missing tree line")?;
        let tree_oid = tree_line
            .strip_prefix("tree ")
            .context("Invalid commit object: invalid tree line")?;
        let tree_oid = ObjectId::try_parse(tree_oid)?;

        // Parse all parent lines (there can be 0, 1, or multiple parents)
        let mut parents = Vec::new();
        let mut next_line = lines
            .next()
            .context("Invalid commit object: missing author line")?;

        while let Some(parent_oid) = next_line.strip_prefix("parent ") {
            parents.push(ObjectId::try_parse(parent_oid)?);

            next_line = lines
                .next()
                .context("Invalid commit object: missing author line")?;
        }

        let author = next_line
            .strip_prefix("author ")
            .context("Invalid commit object: invalid author line")?;
        let author = Author::try_from(author)?;

        let committer_line = lines
            .next()
            .context("Invalid commit object: missing committer line")?;
        let committer = committer_line
            .strip_prefix("committer ")
            .context("Invalid commit object: invalid committer line")?;
        let committer = Author::try_from(committer)?;

        // other extra headers (gpgsig, mergetag) are not needed by the walk

        Ok(Self::new(
            oid,
            parents,
            tree_oid,
            author,
            committer,
            decode_text(message, encoding),
        ))
    }

    /// Serialize the commit body in the canonical Git layout
    pub fn to_bytes(&self) -> Bytes {
        let mut lines = vec![];

        lines.push(format!("tree {}", self.tree_oid));
        for parent in &self.parents {
            lines.push(format!("parent {parent}"));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines.push(String::new());
        lines.push(self.message.clone());

        Bytes::from(lines.join("\n"))
    }

    /// Id the body would hash to as a commit object
    pub fn computed_oid(&self) -> ObjectId {
        ObjectId::hash_object(ObjectType::Commit, &self.to_bytes())
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Get the first line of the commit message
    ///
    /// Useful for short-form display (e.g., `git log --oneline`)
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    /// Commit time in seconds since the epoch, the default walk ordering key
    pub fn commit_time(&self) -> i64 {
        self.committer.timestamp().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
    const PARENT_A: &str = "1111111111111111111111111111111111111111";
    const PARENT_B: &str = "2222222222222222222222222222222222222222";

    fn body(parents: &[&str]) -> String {
        let mut text = format!("tree {TREE}\n");
        for parent in parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str("author Ada Lovelace <ada@example.com> 1700000000 +0200\n");
        text.push_str("committer Grace Hopper <grace@example.com> 1700000100 -0500\n");
        text.push_str("\nSubject line\n\nBody text\n");
        text
    }

    #[test]
    fn parses_root_commit() {
        let oid = ObjectId::from_bytes([1; 20]);
        let commit = Commit::parse(oid, body(&[]).as_bytes()).unwrap();

        assert_eq!(commit.oid(), &oid);
        assert!(commit.parents().is_empty());
        assert_eq!(commit.tree_oid().to_hex(), TREE);
        assert_eq!(commit.author().display_name(), "Ada Lovelace <ada@example.com>");
        assert_eq!(commit.committer().name(), "Grace Hopper");
        assert_eq!(commit.commit_time(), 1_700_000_100);
        assert_eq!(commit.short_message(), "Subject line");
        assert_eq!(commit.message(), "Subject line\n\nBody text\n");
    }

    #[test]
    fn parses_merge_parents_in_order() {
        let commit = Commit::parse(
            ObjectId::default(),
            body(&[PARENT_A, PARENT_B]).as_bytes(),
        )
        .unwrap();

        let parents: Vec<String> = commit.parents().iter().map(ObjectId::to_hex).collect();
        assert_eq!(parents, vec![PARENT_A, PARENT_B]);
        assert!(commit.is_merge());
    }

    #[test]
    fn keeps_timezone_of_author_line() {
        let author = Author::try_from("Ada <ada@example.com> 1700000000 +0200").unwrap();

        assert_eq!(author.timestamp().timestamp(), 1_700_000_000);
        assert_eq!(author.display(), "Ada <ada@example.com> 1700000000 +0200");
    }

    #[test]
    fn serialized_body_parses_back() {
        let parsed = Commit::parse(ObjectId::default(), body(&[PARENT_A]).as_bytes()).unwrap();
        let reparsed = Commit::parse(ObjectId::default(), &parsed.to_bytes()).unwrap();

        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn undecodable_message_bytes_are_replaced() {
        let mut content = body(&[]).into_bytes();
        content.extend_from_slice(b"caf\xe9\n");

        let commit = Commit::parse(ObjectId::default(), &content).unwrap();

        assert_eq!(commit.message(), "Subject line\n\nBody text\ncaf\u{fffd}\n");
        assert_eq!(commit.commit_time(), 1_700_000_100);
    }

    #[test]
    fn declared_latin1_encoding_is_decoded() {
        let mut content = format!("tree {TREE}\n").into_bytes();
        content.extend_from_slice(b"author Ren\xe9 <rene@example.com> 1700000000 +0100\n");
        content.extend_from_slice(b"committer Ren\xe9 <rene@example.com> 1700000000 +0100\n");
        content.extend_from_slice(b"encoding ISO-8859-1\n\nCaf\xe9 cr\xe8me\n");

        let commit = Commit::parse(ObjectId::default(), &content).unwrap();

        assert_eq!(commit.author().name(), "Ren\u{e9}");
        assert_eq!(commit.short_message(), "Caf\u{e9} cr\u{e8}me");
    }

    #[test]
    fn rejects_missing_committer() {
        let text = format!("tree {TREE}\nauthor A <a@b> 1 +0000\n\nmsg");
        assert!(Commit::parse(ObjectId::default(), text.as_bytes()).is_err());
    }
}
