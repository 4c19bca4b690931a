// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use tokio::sync::oneshot;

/// Out-of-band request applied by the editor between two input events.
#[derive(Debug)]
pub enum ControlOp {
    /// Clear the row and stop rendering until [`ControlOp::ShowPrompt`].
    HidePrompt,
    /// Resume rendering and redraw the prompt and line.
    ShowPrompt,
    /// Replace the prompt text and redraw.
    ChangePrompt(String),
}

/// A control request plus its acknowledgement channel.
///
/// The editor fires the ack only after the operation has been applied and
/// the row redrawn; the reply channel belongs to this request alone, so a
/// caller that pipelines several requests can tell exactly which ones have
/// taken effect.
#[derive(Debug)]
pub struct PromptControl {
    pub op: ControlOp,
    pub ack: oneshot::Sender<()>,
}
