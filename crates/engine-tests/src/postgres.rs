//! Sample jobs against a live Postgres. Run with
//! `TEST_DATABASE_URL=... cargo test -p engine-tests -- --ignored --test-threads=1`.
