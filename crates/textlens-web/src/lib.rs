// Web front end: router, handlers and the HTML page. The `textlens` binary
// wires these to the config and the Gemini client.

pub mod page;
pub mod server;
