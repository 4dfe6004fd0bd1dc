//! Downloader tests against a scripted portal (see `test_helpers`).
