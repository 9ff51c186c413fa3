//! Box packing, animation-group layout and sheet compositing.

mod anim;
mod page;
mod sheet;

pub use anim::{check_sprite_sizes, layout_anim_group, AnimPlacement, GroupLayout};
pub use page::{pack_boxes, Packing, Page};
pub use sheet::{compose_grid, grid_position, PageImage, SHEET_PX};
