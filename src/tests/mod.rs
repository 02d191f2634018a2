pub mod keys_tests;
