mod preview;
mod setup;
