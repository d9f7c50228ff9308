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

//! A small GLSL declaration scanner.
//!
//! The headless device has no compiler, so it derives a program's interface
//! from the declarations in its sources: loose `uniform` declarations,
//! `uniform` blocks and vertex-stage `in` inputs. Every declaration counts
//! as active.

use ember_core::renderer::GlslType;

/// A declared loose uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredUniform {
    /// The name without array suffix.
    pub name: String,
    /// The GLSL type.
    pub glsl_type: GlslType,
    /// Array length; 1 for non-arrays.
    pub array_size: u32,
}

/// The interface declared by one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredInterface {
    /// Loose uniforms in declaration order.
    pub uniforms: Vec<DeclaredUniform>,
    /// Uniform block names in declaration order.
    pub blocks: Vec<String>,
    /// Vertex inputs in declaration order.
    pub inputs: Vec<String>,
}

impl DeclaredInterface {
    /// Adds the declarations of another stage, skipping names already present.
    pub fn merge(&mut self, other: DeclaredInterface) {
        for uniform in other.uniforms {
            if !self.uniforms.iter().any(|u| u.name == uniform.name) {
                self.uniforms.push(uniform);
            }
        }
        for block in other.blocks {
            if !self.blocks.contains(&block) {
                self.blocks.push(block);
            }
        }
        for input in other.inputs {
            if !self.inputs.contains(&input) {
                self.inputs.push(input);
            }
        }
    }
}

fn parse_type(word: &str) -> GlslType {
    match word {
        "float" => GlslType::Float,
        "vec2" => GlslType::Vec2,
        "vec3" => GlslType::Vec3,
        "vec4" => GlslType::Vec4,
        "int" | "bool" => GlslType::Int,
        "ivec2" => GlslType::IVec2,
        "ivec3" => GlslType::IVec3,
        "ivec4" => GlslType::IVec4,
        "mat2" => GlslType::Mat2,
        "mat3" => GlslType::Mat3,
        "mat4" => GlslType::Mat4,
        "sampler2D" => GlslType::Sampler2D,
        "sampler3D" => GlslType::Sampler3D,
        "samplerCube" => GlslType::SamplerCube,
        "sampler2DArray" => GlslType::Sampler2DArray,
        _ => GlslType::Other(0),
    }
}

fn is_qualifier(word: &str) -> bool {
    matches!(word, "lowp" | "mediump" | "highp" | "flat" | "smooth")
}

/// Strips a leading `layout(...)` qualifier.
fn strip_layout(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("layout") {
        if let Some(end) = rest.find(')') {
            return rest[end + 1..].trim_start();
        }
    }
    line
}

/// Splits `name[N]` into the name and its array length.
fn parse_declarator(text: &str) -> (String, u32) {
    let text = text.trim();
    match text.split_once('[') {
        Some((name, rest)) => {
            let size = rest
                .trim_end_matches(']')
                .trim()
                .parse::<u32>()
                .unwrap_or(1);
            (name.trim().to_string(), size.max(1))
        }
        None => (text.to_string(), 1),
    }
}

/// Scans one stage's source.
pub fn scan(source: &str, vertex_stage: bool) -> DeclaredInterface {
    let mut interface = DeclaredInterface::default();
    let mut in_block = false;
    let mut pending_block: Option<String> = None;

    for raw in source.lines() {
        let line = raw.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if in_block {
            if line.starts_with('}') {
                in_block = false;
            }
            continue;
        }

        if let Some(name) = pending_block.take() {
            if line.starts_with('{') {
                interface.blocks.push(name);
                in_block = !line.contains('}');
                continue;
            }
        }

        let line = strip_layout(line);

        if let Some(rest) = line.strip_prefix("uniform ") {
            let declaration = rest.trim();
            if declaration.contains('{') || !declaration.contains(';') {
                let name = declaration
                    .split(|c: char| c.is_whitespace() || c == '{')
                    .next()
                    .unwrap_or("")
                    .to_string();
                if declaration.contains('{') {
                    interface.blocks.push(name);
                    in_block = !declaration.contains('}');
                } else {
                    pending_block = Some(name);
                }
                continue;
            }

            let body = declaration.trim_end_matches(';');
            let mut words = body.split_whitespace().filter(|w| !is_qualifier(w));
            let (Some(ty), Some(rest)) = (words.next(), words.next()) else {
                continue;
            };
            let tail: Vec<&str> = std::iter::once(rest).chain(words).collect();
            let (name, array_size) = parse_declarator(&tail.join(""));
            interface.uniforms.push(DeclaredUniform {
                name,
                glsl_type: parse_type(ty),
                array_size,
            });
            continue;
        }

        if vertex_stage {
            let input = line
                .strip_prefix("in ")
                .or_else(|| line.strip_prefix("attribute "));
            if let Some(rest) = input {
                let body = rest.trim().trim_end_matches(';');
                let name = body
                    .split_whitespace()
                    .filter(|w| !is_qualifier(w))
                    .nth(1)
                    .unwrap_or("");
                if !name.is_empty() {
                    interface.inputs.push(parse_declarator(name).0);
                }
            }
        }
    }

    interface
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
        #version 330
        in vec3 emberPosition;
        layout(location = 1) in vec3 emberNormal;
        uniform mat4 emberModel;
        uniform highp mat4 emberViews[2];
        uniform sampler2D emberDiffuseTexture; // diffuse
        layout(std140) uniform Lights {
            vec4 positions[4];
        };
        uniform Extra
        {
            float gain;
        };
        void main() {}
    "#;

    #[test]
    fn test_scan_uniforms() {
        let interface = scan(VERTEX, true);
        let names: Vec<&str> = interface.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["emberModel", "emberViews", "emberDiffuseTexture"]);
        assert_eq!(interface.uniforms[1].array_size, 2);
        assert_eq!(interface.uniforms[1].glsl_type, GlslType::Mat4);
        assert_eq!(interface.uniforms[2].glsl_type, GlslType::Sampler2D);
    }

    #[test]
    fn test_scan_blocks_and_inputs() {
        let interface = scan(VERTEX, true);
        assert_eq!(interface.blocks, ["Lights", "Extra"]);
        assert_eq!(interface.inputs, ["emberPosition", "emberNormal"]);
    }

    #[test]
    fn test_fragment_stage_has_no_inputs() {
        let interface = scan("in vec2 uv;\nuniform float x;", false);
        assert!(interface.inputs.is_empty());
        assert_eq!(interface.uniforms.len(), 1);
    }

    #[test]
    fn test_merge_deduplicates() {
        let mut a = scan("uniform float x;\nuniform vec4 emberColor;", false);
        a.merge(scan("uniform vec4 emberColor;\nuniform int y;", false));
        let names: Vec<&str> = a.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["x", "emberColor", "y"]);
    }
}
