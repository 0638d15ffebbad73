use std::fs;

use buildcore::depdb::{DepDb, Expect};
use buildcore::util::hash::Checksum;

use super::common::TestBuild;

/// What a compile rule records: the command checksum, then the headers.
fn record(db: &mut DepDb, command: &[&str], headers: &[&str]) -> bool {
  let mut checksum = Checksum::new();
  checksum.append_all(command);
  let mut changed = db.expect(checksum.finish().as_str()).unwrap() != Expect::Match;

  for header in headers {
    changed |= db.expect(header).unwrap() != Expect::Match;
  }
  // Unread lines left over from last time are dropped on close.
  changed || db.more()
}

#[test]
fn unchanged_inputs_are_not_stale() {
  let build = TestBuild::new();
  let path = build.out_file("hello.o.d");

  let mut db = DepDb::open(&path).unwrap();
  assert!(record(&mut db, &["g++", "-O2", "-c", "hello.cxx"], &["hello.hxx"]));
  db.close().unwrap();

  let mut db = DepDb::open(&path).unwrap();
  assert!(!record(&mut db, &["g++", "-O2", "-c", "hello.cxx"], &["hello.hxx"]));
  assert!(db.reading());
  db.close().unwrap();
}

#[test]
fn changed_options_make_the_target_stale() {
  let build = TestBuild::new();
  let path = build.out_file("hello.o.d");

  let mut db = DepDb::open(&path).unwrap();
  record(&mut db, &["g++", "-O2", "-c", "hello.cxx"], &["hello.hxx", "config.hxx"]);
  db.close().unwrap();

  let mut db = DepDb::open(&path).unwrap();
  assert!(record(&mut db, &["g++", "-O3", "-c", "hello.cxx"], &["hello.hxx"]));
  assert!(db.writing());
  db.close().unwrap();

  // The dropped header is gone from the record.
  let mut db = DepDb::open(&path).unwrap();
  assert!(db.read().unwrap().is_some());
  assert_eq!(db.read().unwrap(), Some("hello.hxx"));
  assert_eq!(db.read().unwrap(), None);
}

#[test]
fn removed_trailing_line_makes_the_target_stale() {
  let build = TestBuild::new();
  let path = build.out_file("hello.o.d");

  let mut db = DepDb::open(&path).unwrap();
  record(&mut db, &["g++"], &["a.hxx", "b.hxx"]);
  db.close().unwrap();

  let mut db = DepDb::open(&path).unwrap();
  assert!(record(&mut db, &["g++"], &["a.hxx"]));
  db.close().unwrap();

  let mut db = DepDb::open(&path).unwrap();
  assert!(!record(&mut db, &["g++"], &["a.hxx"]));
}

#[test]
fn corrupted_database_is_rebuilt() {
  let build = TestBuild::new();
  let path = build.out_file("hello.o.d");

  let mut db = DepDb::open(&path).unwrap();
  record(&mut db, &["g++"], &["a.hxx", "b.hxx"]);
  db.close().unwrap();

  // Something outside the engine chops the file.
  let bytes = fs::read(&path).unwrap();
  fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

  let mut db = DepDb::open(&path).unwrap();
  assert!(record(&mut db, &["g++"], &["a.hxx", "b.hxx"]));
  db.close().unwrap();

  let mut db = DepDb::open(&path).unwrap();
  assert!(!record(&mut db, &["g++"], &["a.hxx", "b.hxx"]));
}
