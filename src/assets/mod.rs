pub mod inventory;
pub mod ops;

pub use inventory::{
    build_inventory, AssetBlobEntry, AssetFile, AssetFolder, Inventory, RepoSelection,
};
