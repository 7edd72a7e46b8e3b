pub mod playwright;
