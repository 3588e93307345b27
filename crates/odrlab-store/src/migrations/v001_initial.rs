//! v001 -- Initial schema creation.
//!
//! Creates the identity tables (`users` plus the four role-extension tables),
//! the idea workflow tables, the collaboration tables, and the audit log.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (base identity)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,       -- stored lower-cased and trimmed
    password_hash  TEXT,                       -- NULL for Google-only accounts
    contact_number TEXT,
    city           TEXT,
    country        TEXT,
    image_avatar   TEXT,
    role           TEXT NOT NULL,              -- ADMIN | INNOVATOR | MENTOR | FACULTY | OTHER
    created_at     TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    updated_at     TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Role extensions (one table per non-admin role, 1:1 with users)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS innovators (
    user_id           TEXT PRIMARY KEY NOT NULL,
    institution       TEXT,
    highest_education TEXT,
    course_name       TEXT,
    course_status     TEXT,
    description       TEXT,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS mentors (
    user_id          TEXT PRIMARY KEY NOT NULL,
    mentor_type      TEXT NOT NULL DEFAULT 'TECHNICAL_EXPERT',
    organization     TEXT,
    role             TEXT,                     -- free-text position label
    expertise        TEXT,
    description      TEXT,
    approved         INTEGER NOT NULL DEFAULT 0,
    rejection_reason TEXT,
    reviewed_at      TEXT,
    reviewed_by      TEXT,                     -- UUID of the reviewing admin

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS faculties (
    user_id     TEXT PRIMARY KEY NOT NULL,
    institution TEXT,
    role        TEXT,
    expertise   TEXT,
    course      TEXT,
    mentoring   INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    description TEXT,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS others (
    user_id     TEXT PRIMARY KEY NOT NULL,
    role        TEXT,
    workplace   TEXT,
    description TEXT,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Idea submissions (review holding area)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS idea_submissions (
    id                   TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    title                TEXT NOT NULL,
    caption              TEXT,
    description          TEXT NOT NULL,
    prior_odr_experience TEXT,
    owner_id             TEXT NOT NULL,
    reviewed             INTEGER NOT NULL DEFAULT 0,
    approved             INTEGER NOT NULL DEFAULT 0,
    rejected             INTEGER NOT NULL DEFAULT 0,
    rejection_reason     TEXT,
    reviewed_at          TEXT,
    reviewed_by          TEXT,
    created_at           TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_submissions_owner ON idea_submissions(owner_id);
CREATE INDEX IF NOT EXISTS idx_submissions_reviewed ON idea_submissions(reviewed);

-- ----------------------------------------------------------------
-- Ideas (published)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ideas (
    id          TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    title       TEXT NOT NULL,
    caption     TEXT,
    description TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    approved    INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_ideas_owner ON ideas(owner_id);

-- ----------------------------------------------------------------
-- Collaboration membership (join rows, unique per pair)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS idea_collaborators (
    user_id    TEXT NOT NULL,
    idea_id    TEXT NOT NULL,
    role       TEXT,                           -- optional label
    created_at TEXT NOT NULL,

    PRIMARY KEY (user_id, idea_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS idea_mentors (
    user_id    TEXT NOT NULL,
    idea_id    TEXT NOT NULL,
    role       TEXT,
    created_at TEXT NOT NULL,

    PRIMARY KEY (user_id, idea_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Comments (threaded via parent_id)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    id         TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    content    TEXT NOT NULL,
    idea_id    TEXT NOT NULL,
    author_id  TEXT NOT NULL,
    parent_id  TEXT,                           -- nullable, self-referential
    created_at TEXT NOT NULL,

    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_idea ON comments(idea_id, created_at ASC);

-- ----------------------------------------------------------------
-- Likes (idea XOR comment, unique once per user per target)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS likes (
    id         TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id    TEXT NOT NULL,
    idea_id    TEXT,
    comment_id TEXT,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE,
    FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE,

    CHECK ((idea_id IS NULL) != (comment_id IS NULL)),
    UNIQUE (user_id, idea_id),
    UNIQUE (user_id, comment_id)
);

-- ----------------------------------------------------------------
-- Audit log (append-only, never read by the application)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS audit_log (
    id          TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    action      TEXT NOT NULL,
    user_id     TEXT,                          -- no FK: entries outlive users
    user_role   TEXT,
    target_id   TEXT,
    target_type TEXT,
    success     INTEGER NOT NULL DEFAULT 1,
    message     TEXT,
    ip_address  TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
