pub mod d400_dealership_summary;
