/// Whether a forward pass is part of training or of inference.
///
/// Layers such as `BatchNorm` and `Dropout` behave differently on each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}
