pub mod premium_expiry;
