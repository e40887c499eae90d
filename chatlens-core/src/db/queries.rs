//! SQL used against the message archive.
//!
//! Every query reads the same two-part shape:
//! - outgoing messages, one row per participant of the chat they were sent to
//! - incoming messages, one row per sender
//!
//! Timestamps in `message.date` are nanoseconds since 2001-01-01 UTC. Buckets
//! are derived with SQLite's `localtime` modifier so boundaries follow the
//! process's local time zone.

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
pub const ARCHIVE_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Tables the archive must provide for any query to work.
pub const REQUIRED_TABLES: [&str; 4] = [
    "message",
    "handle",
    "chat_message_join",
    "chat_handle_join",
];

/// Union of outgoing-per-recipient and incoming-per-sender rows carrying the
/// message timestamp.
const TIMESTAMPED_UNION: &str = r#"
    SELECT
      h.id   AS person,
      m.date AS date,
      1      AS direction
    FROM message AS m
    JOIN chat_message_join AS cmj ON cmj.message_id = m.ROWID
    JOIN chat_handle_join  AS chj ON chj.chat_id = cmj.chat_id
    JOIN handle            AS h   ON h.ROWID = chj.handle_id
    WHERE m.is_from_me = 1

    UNION ALL

    SELECT
      h.id   AS person,
      m.date AS date,
      0      AS direction
    FROM message AS m
    JOIN handle AS h ON h.ROWID = m.handle_id
    WHERE m.is_from_me = 0
"#;

/// Build the per-day count query.
pub fn daily_counts_sql() -> String {
    format!(
        r#"
        SELECT
          person,
          DATE((date / 1000000000) + {offset}, 'unixepoch', 'localtime') AS day,
          direction,
          COUNT(*) AS count
        FROM ({union}) AS combined
        GROUP BY person, day, direction
        ORDER BY person, day, direction
        "#,
        offset = ARCHIVE_EPOCH_OFFSET_SECS,
        union = TIMESTAMPED_UNION,
    )
}

/// Build the per-hour-of-day count query.
pub fn hourly_counts_sql() -> String {
    format!(
        r#"
        SELECT
          person,
          CAST(strftime('%H', (date / 1000000000) + {offset}, 'unixepoch', 'localtime') AS INTEGER) AS hour,
          direction,
          COUNT(*) AS count
        FROM ({union}) AS combined
        GROUP BY person, hour, direction
        ORDER BY person, hour, direction
        "#,
        offset = ARCHIVE_EPOCH_OFFSET_SECS,
        union = TIMESTAMPED_UNION,
    )
}

/// Message bodies for readability scoring, in the same union shape.
pub const MESSAGE_BODIES_SQL: &str = r#"
    SELECT person, direction, txt, attr, has_attachments
    FROM (
      SELECT
        h.id                    AS person,
        1                       AS direction,
        m.text                  AS txt,
        m.attributedBody        AS attr,
        m.cache_has_attachments AS has_attachments
      FROM message AS m
      JOIN chat_message_join AS cmj ON cmj.message_id = m.ROWID
      JOIN chat_handle_join  AS chj ON chj.chat_id = cmj.chat_id
      JOIN handle            AS h   ON h.ROWID = chj.handle_id
      WHERE m.is_from_me = 1
        AND (m.text IS NOT NULL OR m.attributedBody IS NOT NULL OR m.cache_has_attachments = 1)

      UNION ALL

      SELECT
        h.id                    AS person,
        0                       AS direction,
        m.text                  AS txt,
        m.attributedBody        AS attr,
        m.cache_has_attachments AS has_attachments
      FROM message AS m
      JOIN handle AS h ON h.ROWID = m.handle_id
      WHERE m.is_from_me = 0
        AND (m.text IS NOT NULL OR m.attributedBody IS NOT NULL OR m.cache_has_attachments = 1)
    ) AS combined
"#;
