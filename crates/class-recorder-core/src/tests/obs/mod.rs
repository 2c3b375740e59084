mod controller;
mod protocol;
mod session;
