mod drive;
mod obs;
mod upload;
