//! Dependency database: a per-target, append-only journal of the inputs that
//! produced the target.
//!
//! A rule opens the database of the target it is about to update, reads the
//! stored lines and compares them against what the current build would record
//! (typically the command line checksum followed by discovered dependencies).
//! On the first mismatch it overwrites from that line onward; if nothing was
//! written the target is up to date as far as its inputs are concerned.
//!
//! # Format
//!
//! ```text
//! 1\n          format version
//! <line>\n     zero or more lines
//! \0           end marker, present only if the database was closed cleanly
//! ```
//!
//! Lines are arbitrary bytes other than newline. [`DepDb::read`] presents them
//! as text, with invalid UTF-8 replaced; [`DepDb::read_bytes`] returns them
//! exactly as stored.
//!
//! Anything after the first structural defect (a line without a terminator,
//! end of file where the end marker or the next line should be) is ignored and
//! the database switches to writing at the start of the defective line.
//!
//! Switching from reading to writing never truncates. Instead every byte from
//! the overwrite position to the end of the file is replaced with `\0`. If the
//! following write is interrupted, the partial new line can never combine with
//! the suffix of an old line into something that looks valid.

use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, trace};

use crate::consts::{DEPDB_END_MARKER, DEPDB_FORMAT_VERSION};

#[derive(Debug, Error)]
pub enum DepDbError {
  #[error("unable to open {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unable to create {path}: {source}")]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(
    "unable to create {path}: directory {dir} does not exist\n\
     did you forget to add fsdir{{}} prerequisite for output directory?"
  )]
  MissingDirectory {
    path: PathBuf,
    dir: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("backwards modification times detected: {db} is newer than {target}")]
  MtimeSkew { db: PathBuf, target: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepDbState {
  /// Appending. There is no read position.
  Write,
  /// Positioned at the start of the next unread line.
  Read,
  /// Positioned at the end marker. Nothing more to read but writing may
  /// still start here.
  ReadEnd,
}

/// Outcome of [`DepDb::expect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
  /// The stored line matched.
  Match,
  /// The stored line differed and was overwritten. Carries the old value,
  /// with invalid UTF-8 replaced.
  Mismatch(String),
  /// There was no line to compare against; the value was written.
  Missing,
}

enum Stream {
  Read(BufReader<File>),
  Write(BufWriter<File>),
  Closed,
}

pub struct DepDb {
  path: PathBuf,
  mtime: Option<SystemTime>,
  touch: bool,
  state: DepDbState,
  stream: Stream,
  /// Start of the line returned by the last read: where writing resumes.
  pos: u64,
  /// Current read position.
  cur: u64,
  line: Vec<u8>,
}

impl DepDb {
  /// Open the database at `path`, creating it if it does not exist.
  ///
  /// An existing database with a matching version starts out in
  /// [`DepDbState::Read`] (or [`DepDbState::ReadEnd`] if it holds no lines).
  /// A missing, empty or obsolete one starts out in [`DepDbState::Write`] with
  /// the version line already written.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, DepDbError> {
    let path = path.into();

    let mtime = match fs::metadata(&path) {
      Ok(meta) => Some(meta.modified().map_err(|source| DepDbError::Open {
        path: path.clone(),
        source,
      })?),
      Err(e) if e.kind() == io::ErrorKind::NotFound => None,
      Err(source) => return Err(DepDbError::Open { path, source }),
    };

    let (state, stream) = match mtime {
      Some(_) => {
        let file = OpenOptions::new()
          .read(true)
          .write(true)
          .open(&path)
          .map_err(|source| DepDbError::Open {
            path: path.clone(),
            source,
          })?;
        (DepDbState::Read, Stream::Read(BufReader::new(file)))
      }
      None => {
        let file = OpenOptions::new()
          .read(true)
          .write(true)
          .create(true)
          .truncate(true)
          .open(&path)
          .map_err(|source| create_error(&path, source))?;
        (DepDbState::Write, Stream::Write(BufWriter::new(file)))
      }
    };

    let mut db = DepDb {
      path,
      mtime,
      touch: false,
      state,
      stream,
      pos: 0,
      cur: 0,
      line: Vec::new(),
    };

    if db.state == DepDbState::Read {
      match db.read_bytes()?.map(|v| String::from_utf8_lossy(v).into_owned()) {
        // Writing without reading starts at the first line, not the version.
        Some(version) if version == DEPDB_FORMAT_VERSION => db.pos = db.cur,
        version => {
          debug!(path = ?db.path, version = ?version, "obsolete or invalid dependency database, overwriting");
          db.write(DEPDB_FORMAT_VERSION)?;
        }
      }
    } else {
      db.write(DEPDB_FORMAT_VERSION)?;
    }

    debug!(path = ?db.path, state = ?db.state, "opened dependency database");
    Ok(db)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Modification time of the database as found at open, `None` if it did not
  /// exist or anything has been written since.
  pub fn mtime(&self) -> Option<SystemTime> {
    self.mtime
  }

  pub fn state(&self) -> DepDbState {
    self.state
  }

  /// True if there may be more lines to read.
  pub fn more(&self) -> bool {
    self.state == DepDbState::Read
  }

  pub fn reading(&self) -> bool {
    self.state != DepDbState::Write
  }

  pub fn writing(&self) -> bool {
    self.state == DepDbState::Write
  }

  /// Request that a database closed without changes still gets a new
  /// modification time.
  pub fn set_touch(&mut self, touch: bool) {
    self.touch = touch;
  }

  /// Read the next line as text.
  ///
  /// Returns `None` when writing, at the end marker, or when the line is
  /// invalid. In the last case the database has switched to writing and the
  /// next write replaces the invalid line. Bytes that are not UTF-8 are
  /// replaced with U+FFFD, so such a line never equals the text it was
  /// written from; use [`read_bytes`](Self::read_bytes) to compare exactly.
  pub fn read(&mut self) -> Result<Option<&str>, DepDbError> {
    if self.read_bytes()?.is_none() {
      return Ok(None);
    }
    let replaced = match String::from_utf8_lossy(&self.line) {
      Cow::Borrowed(_) => None,
      Cow::Owned(text) => Some(text),
    };
    if let Some(text) = replaced {
      trace!(path = ?self.path, offset = self.pos, "dependency database line is not UTF-8");
      self.line = text.into_bytes();
    }
    Ok(std::str::from_utf8(&self.line).ok())
  }

  /// Read the next line exactly as stored, without its newline.
  ///
  /// Same as [`read`](Self::read) otherwise.
  pub fn read_bytes(&mut self) -> Result<Option<&[u8]>, DepDbError> {
    let valid = self.read_line().map_err(|source| self.io_error(source))?;
    Ok(valid.then_some(self.line.as_slice()))
  }

  /// Skip the remaining lines without looking at them.
  ///
  /// Returns `true` if the end marker was reached. Otherwise the database is
  /// invalid past the last read line and has switched to writing there.
  pub fn skip(&mut self) -> Result<bool, DepDbError> {
    self.skip_lines().map_err(|source| self.io_error(source))
  }

  /// Read the next line and compare it to `value`, overwriting it with
  /// `value` on anything but an exact match.
  pub fn expect(&mut self, value: &str) -> Result<Expect, DepDbError> {
    let old = match self.read_bytes()? {
      Some(old) if old == value.as_bytes() => return Ok(Expect::Match),
      old => old.map(|old| String::from_utf8_lossy(old).into_owned()),
    };
    self.write(value)?;
    Ok(old.map_or(Expect::Missing, Expect::Mismatch))
  }

  /// Write a line. The line must not contain a newline.
  pub fn write(&mut self, line: &str) -> Result<(), DepDbError> {
    debug_assert!(!line.contains('\n'), "depdb line contains a newline");
    self.write_raw(line.as_bytes(), true)
  }

  /// Write raw bytes, optionally followed by a newline.
  ///
  /// The first write after reading overwrites starting at the last read line.
  pub fn write_raw(&mut self, bytes: &[u8], newline: bool) -> Result<(), DepDbError> {
    self.write_bytes(bytes, newline).map_err(|source| self.io_error(source))
  }

  /// Close the database, writing the end marker if anything changed.
  ///
  /// A database that was read to its end marker and not written is left
  /// untouched unless [`set_touch`](Self::set_touch) was requested.
  pub fn close(mut self) -> Result<(), DepDbError> {
    self.close_stream().map_err(|source| self.io_error(source))?;

    // Some platforms can report a modification time that is later than the
    // return from close(). Querying it forces the filesystem to commit to a
    // timestamp so the database never appears newer than its target.
    #[cfg(any(windows, target_os = "freebsd"))]
    if self.state == DepDbState::Write {
      if let Err(e) = fs::metadata(&self.path).and_then(|m| m.modified()) {
        debug!(path = ?self.path, error = %e, "unable to query dependency database modification time");
      }
    }

    debug!(path = ?self.path, state = ?self.state, "closed dependency database");
    Ok(())
  }

  /// Verify that the database at `db` is not newer than the target at
  /// `target`. Both files must exist.
  pub fn check_mtime(db: &Path, target: &Path) -> Result<(), DepDbError> {
    let mtime = |path: &Path| {
      fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| DepDbError::Io {
          path: path.to_path_buf(),
          source,
        })
    };

    if mtime(db)? > mtime(target)? {
      return Err(DepDbError::MtimeSkew {
        db: db.to_path_buf(),
        target: target.to_path_buf(),
      });
    }
    Ok(())
  }

  fn read_line(&mut self) -> io::Result<bool> {
    self.pos = self.cur;

    if self.state == DepDbState::ReadEnd {
      return Ok(false);
    }
    let Stream::Read(reader) = &mut self.stream else {
      return Ok(false);
    };

    self.line.clear();
    let n = reader.read_until(b'\n', &mut self.line)?;
    self.cur += n as u64;

    // A line must be terminated and followed by either the next line or the
    // end marker.
    let next = if self.line.last() == Some(&b'\n') {
      reader.fill_buf()?.first().copied()
    } else {
      None
    };

    let Some(next) = next else {
      trace!(path = ?self.path, offset = self.pos, "dependency database ends without end marker");
      self.change()?;
      return Ok(false);
    };

    self.line.pop();
    if next == DEPDB_END_MARKER {
      self.state = DepDbState::ReadEnd;
    }
    Ok(true)
  }

  fn skip_lines(&mut self) -> io::Result<bool> {
    if self.state == DepDbState::ReadEnd {
      return Ok(true);
    }
    let Stream::Read(reader) = &mut self.stream else {
      return Ok(false);
    };

    self.pos = self.cur;

    loop {
      let n = reader.skip_until(b'\n')?;
      self.cur += n as u64;
      if n == 0 {
        break;
      }

      // Not at end of file means the newline was found.
      match reader.fill_buf()?.first() {
        Some(&DEPDB_END_MARKER) => {
          self.state = DepDbState::ReadEnd;
          return Ok(true);
        }
        Some(_) => {}
        None => break,
      }
    }

    trace!(path = ?self.path, offset = self.pos, "dependency database invalid past skipped lines");
    self.change()?;
    Ok(false)
  }

  /// Switch from reading to writing at `pos`, blanking out the rest of the
  /// file first.
  fn change(&mut self) -> io::Result<()> {
    debug_assert!(self.state != DepDbState::Write);

    let mut file = self.take_file()?;

    let end = file.seek(SeekFrom::End(0))?;
    if end > self.pos {
      file.seek(SeekFrom::Start(self.pos))?;
      io::copy(&mut io::repeat(0).take(end - self.pos), &mut file)?;
    }
    file.seek(SeekFrom::Start(self.pos))?;

    debug!(path = ?self.path, offset = self.pos, blanked = end.saturating_sub(self.pos), "dependency database switched to writing");

    self.stream = Stream::Write(BufWriter::new(file));
    self.state = DepDbState::Write;
    self.mtime = None;
    Ok(())
  }

  fn write_bytes(&mut self, bytes: &[u8], newline: bool) -> io::Result<()> {
    if self.state != DepDbState::Write {
      self.change()?;
    }
    let Stream::Write(writer) = &mut self.stream else {
      return Err(closed());
    };

    writer.write_all(bytes)?;
    if newline {
      writer.write_all(b"\n")?;
    }
    Ok(())
  }

  fn close_stream(&mut self) -> io::Result<()> {
    if self.state == DepDbState::ReadEnd {
      // All lines are good and the end marker is in place. Rewrite the marker
      // in place if a new modification time was requested.
      if self.touch {
        let mut file = self.take_file()?;
        file.seek(SeekFrom::Start(self.cur))?;
        file.write_all(&[DEPDB_END_MARKER])?;
        self.state = DepDbState::Write;
      }
    } else {
      if self.state != DepDbState::Write {
        // Everything read so far is accepted.
        self.pos = self.cur;
        self.change()?;
      }
      let Stream::Write(writer) = &mut self.stream else {
        return Err(closed());
      };
      writer.write_all(&[DEPDB_END_MARKER])?;
      writer.flush()?;
    }

    self.stream = Stream::Closed;
    Ok(())
  }

  fn take_file(&mut self) -> io::Result<File> {
    match std::mem::replace(&mut self.stream, Stream::Closed) {
      Stream::Read(reader) => Ok(reader.into_inner()),
      Stream::Write(writer) => writer.into_inner().map_err(io::IntoInnerError::into_error),
      Stream::Closed => Err(closed()),
    }
  }

  fn io_error(&self, source: io::Error) -> DepDbError {
    DepDbError::Io {
      path: self.path.clone(),
      source,
    }
  }
}

fn closed() -> io::Error {
  io::Error::other("dependency database is closed")
}

fn create_error(path: &Path, source: io::Error) -> DepDbError {
  match path.parent() {
    Some(dir) if source.kind() == io::ErrorKind::NotFound && !dir.as_os_str().is_empty() && !dir.exists() => {
      DepDbError::MissingDirectory {
        path: path.to_path_buf(),
        dir: dir.to_path_buf(),
        source,
      }
    }
    _ => DepDbError::Create {
      path: path.to_path_buf(),
      source,
    },
  }
}
