pub mod assembly; // Case assembling: acquisition → ledger → assembly → import
