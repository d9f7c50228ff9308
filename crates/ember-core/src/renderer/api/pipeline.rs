// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pipeline toggles and their translation to hardware blend/stencil state.

/// How a fragment's color is combined with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Classic alpha blending.
    #[default]
    Alpha,
    /// Additive.
    Add,
    /// Subtract the fragment from the target.
    Subtract,
    /// Multiply with the target.
    Multiply,
    /// Keep the brighter of fragment and target.
    Lighten,
    /// Keep the darker of fragment and target.
    Darken,
    /// Inverse multiply.
    Screen,
    /// Overwrite the target.
    Replace,
}

/// Whether fragment colors are already multiplied by their alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendAlphaMode {
    /// The blend multiplies the source color by its alpha.
    #[default]
    AlphaMultiply,
    /// Source colors arrive premultiplied.
    Premultiplied,
}

/// The hardware blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    /// `src + dst`.
    Add,
    /// `dst - src`.
    ReverseSubtract,
    /// `min(src, dst)`.
    Min,
    /// `max(src, dst)`.
    Max,
}

/// A hardware blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0`.
    Zero,
    /// `1`.
    One,
    /// Source alpha.
    SrcAlpha,
    /// `1 - source alpha`.
    OneMinusSrcAlpha,
    /// `1 - source color`.
    OneMinusSrcColor,
    /// Destination color.
    DstColor,
}

/// A complete hardware blend configuration with separate color and alpha factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// The equation for both color and alpha.
    pub equation: BlendEquation,
    /// Source factor for color.
    pub src_rgb: BlendFactor,
    /// Destination factor for color.
    pub dst_rgb: BlendFactor,
    /// Source factor for alpha.
    pub src_alpha: BlendFactor,
    /// Destination factor for alpha.
    pub dst_alpha: BlendFactor,
}

impl BlendState {
    /// Translates a logical blend mode to its hardware configuration.
    ///
    /// The color source factor is `DstColor` for [`BlendMode::Multiply`];
    /// otherwise it is `SrcAlpha` when the alpha mode asks the blend to
    /// multiply by alpha, and `One` for premultiplied colors.
    pub fn from_modes(mode: BlendMode, alpha_mode: BlendAlphaMode) -> Self {
        use BlendFactor::*;

        let src_rgb = match (mode, alpha_mode) {
            (BlendMode::Multiply, _) => DstColor,
            (_, BlendAlphaMode::AlphaMultiply) => SrcAlpha,
            (_, BlendAlphaMode::Premultiplied) => One,
        };

        let (equation, dst_rgb, src_alpha, dst_alpha) = match mode {
            BlendMode::Alpha => (
                BlendEquation::Add,
                OneMinusSrcAlpha,
                One,
                OneMinusSrcAlpha,
            ),
            BlendMode::Add => (BlendEquation::Add, One, Zero, One),
            BlendMode::Subtract => (BlendEquation::ReverseSubtract, One, Zero, One),
            BlendMode::Multiply => (BlendEquation::Add, Zero, DstColor, Zero),
            BlendMode::Lighten => (BlendEquation::Max, Zero, One, Zero),
            BlendMode::Darken => (BlendEquation::Min, Zero, One, Zero),
            BlendMode::Screen => (
                BlendEquation::Add,
                OneMinusSrcColor,
                One,
                OneMinusSrcColor,
            ),
            BlendMode::Replace => (BlendEquation::Add, Zero, One, Zero),
        };

        Self {
            equation,
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        }
    }
}

/// A comparison used by depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareMode {
    /// No test; the corresponding hardware test is disabled.
    #[default]
    None,
    /// Passes when equal.
    Equal,
    /// Passes when not equal.
    NotEqual,
    /// Passes when less.
    Less,
    /// Passes when less or equal.
    LessEqual,
    /// Passes when greater.
    Greater,
    /// Passes when greater or equal.
    GreaterEqual,
}

impl CompareMode {
    /// Returns the function to program when this mode is a stencil read test.
    ///
    /// The user writes "value < stored" while the hardware evaluates
    /// "reference OP stored" with the reference on the left, so ordering
    /// comparisons flip. Equality tests are symmetric.
    pub fn inverted(self) -> Self {
        match self {
            CompareMode::Less => CompareMode::Greater,
            CompareMode::LessEqual => CompareMode::GreaterEqual,
            CompareMode::Greater => CompareMode::Less,
            CompareMode::GreaterEqual => CompareMode::LessEqual,
            other => other,
        }
    }
}

/// What a stencil write does to the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilAction {
    /// Store the reference value.
    #[default]
    Replace,
    /// Increment, clamping at the maximum.
    Increment,
    /// Decrement, clamping at zero.
    Decrement,
    /// Increment with wrap-around.
    IncrementWrap,
    /// Decrement with wrap-around.
    DecrementWrap,
    /// Bitwise invert.
    Invert,
}

/// A hardware stencil operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    /// Keep the stored value.
    Keep,
    /// Store the reference value.
    Replace,
    /// Increment with clamping.
    Increment,
    /// Decrement with clamping.
    Decrement,
    /// Increment with wrap-around.
    IncrementWrap,
    /// Decrement with wrap-around.
    DecrementWrap,
    /// Bitwise invert.
    Invert,
}

impl From<StencilAction> for StencilOp {
    fn from(action: StencilAction) -> Self {
        match action {
            StencilAction::Replace => StencilOp::Replace,
            StencilAction::Increment => StencilOp::Increment,
            StencilAction::Decrement => StencilOp::Decrement,
            StencilAction::IncrementWrap => StencilOp::IncrementWrap,
            StencilAction::DecrementWrap => StencilOp::DecrementWrap,
            StencilAction::Invert => StencilOp::Invert,
        }
    }
}

/// The vertex order that marks a triangle as front facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Winding {
    /// Clockwise triangles face front.
    Clockwise,
    /// Counter-clockwise triangles face front.
    #[default]
    CounterClockwise,
}

/// How triangles are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Filled.
    Fill,
    /// Outlines only.
    Line,
}

/// A global device capability that can be switched on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Color blending.
    Blend,
    /// Back-face culling.
    CullFace,
    /// The depth test.
    DepthTest,
    /// The stencil test.
    StencilTest,
    /// Linear-to-sRGB conversion on write.
    FramebufferSrgb,
    /// Point size taken from the vertex shader.
    ProgramPointSize,
}

/// A viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Viewport {
    /// Creates a new viewport.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A viewport covering `width` x `height` from the origin.
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Returns `[x, y, width, height]`.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// The pipeline toggles consumed by a draw and diffed by the state cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Whether colors are premultiplied.
    pub blend_alpha_mode: BlendAlphaMode,
    /// Back-face culling.
    pub culling: bool,
    /// Depth test; [`CompareMode::None`] disables it.
    pub depth_test: CompareMode,
    /// Depth writes.
    pub depth_write: bool,
    /// Stencil read test; [`CompareMode::None`] disables it.
    pub stencil_mode: CompareMode,
    /// Reference value for the stencil test.
    pub stencil_value: i32,
    /// Front-face winding.
    pub winding: Winding,
    /// Wireframe rasterization.
    pub wireframe: bool,
    /// Line width in pixels.
    pub line_width: f32,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::Alpha,
            blend_alpha_mode: BlendAlphaMode::AlphaMultiply,
            culling: false,
            depth_test: CompareMode::LessEqual,
            depth_write: true,
            stencil_mode: CompareMode::None,
            stencil_value: 0,
            winding: Winding::CounterClockwise,
            wireframe: false,
            line_width: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_blend_multiplies_by_source_alpha() {
        let state = BlendState::from_modes(BlendMode::Alpha, BlendAlphaMode::AlphaMultiply);
        assert_eq!(state.equation, BlendEquation::Add);
        assert_eq!(state.src_rgb, BlendFactor::SrcAlpha);
        assert_eq!(state.dst_rgb, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(state.src_alpha, BlendFactor::One);
        assert_eq!(state.dst_alpha, BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn test_premultiplied_uses_one_as_source() {
        let state = BlendState::from_modes(BlendMode::Add, BlendAlphaMode::Premultiplied);
        assert_eq!(state.src_rgb, BlendFactor::One);
        assert_eq!(state.dst_rgb, BlendFactor::One);
    }

    #[test]
    fn test_multiply_uses_destination_color_source() {
        for alpha_mode in [BlendAlphaMode::AlphaMultiply, BlendAlphaMode::Premultiplied] {
            let state = BlendState::from_modes(BlendMode::Multiply, alpha_mode);
            assert_eq!(state.src_rgb, BlendFactor::DstColor);
            assert_eq!(state.dst_rgb, BlendFactor::Zero);
            assert_eq!(state.src_alpha, BlendFactor::DstColor);
        }
    }

    #[test]
    fn test_equations_per_mode() {
        let eq = |mode| BlendState::from_modes(mode, BlendAlphaMode::Premultiplied).equation;
        assert_eq!(eq(BlendMode::Subtract), BlendEquation::ReverseSubtract);
        assert_eq!(eq(BlendMode::Lighten), BlendEquation::Max);
        assert_eq!(eq(BlendMode::Darken), BlendEquation::Min);
        assert_eq!(eq(BlendMode::Screen), BlendEquation::Add);
    }

    #[test]
    fn test_stencil_inversion() {
        assert_eq!(CompareMode::Less.inverted(), CompareMode::Greater);
        assert_eq!(CompareMode::GreaterEqual.inverted(), CompareMode::LessEqual);
        assert_eq!(CompareMode::Equal.inverted(), CompareMode::Equal);
        assert_eq!(CompareMode::NotEqual.inverted(), CompareMode::NotEqual);
    }
}
