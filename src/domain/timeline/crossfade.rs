//! 交叉淡化曲线
//!
//! 曲线形状与 ffmpeg `acrossfade` 的同名曲线一致

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;

use super::errors::AssemblyError;

/// 淡化曲线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossfadeCurve {
    /// 线性
    Tri,
    /// 四分之一正弦
    Qsin,
    /// 半正弦
    #[default]
    Hsin,
    /// 对数
    Log,
    /// 指数
    Exp,
}

impl CrossfadeCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossfadeCurve::Tri => "tri",
            CrossfadeCurve::Qsin => "qsin",
            CrossfadeCurve::Hsin => "hsin",
            CrossfadeCurve::Log => "log",
            CrossfadeCurve::Exp => "exp",
        }
    }

    /// 淡入增益，`t` 为淡化窗口内的相对位置 [0, 1]
    ///
    /// 淡出增益为 `gain(1 - t)`
    pub fn gain(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            CrossfadeCurve::Tri => t,
            CrossfadeCurve::Qsin => (t * PI / 2.0).sin(),
            CrossfadeCurve::Hsin => (1.0 - (t * PI).cos()) / 2.0,
            CrossfadeCurve::Log => {
                if t <= 0.0 {
                    0.0
                } else {
                    (1.0 + 0.2 * t.log10()).clamp(0.0, 1.0)
                }
            }
            CrossfadeCurve::Exp => (-11.512925464970227 * (1.0 - t)).exp(),
        }
    }
}

impl std::fmt::Display for CrossfadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CrossfadeCurve {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tri" => Ok(CrossfadeCurve::Tri),
            "qsin" => Ok(CrossfadeCurve::Qsin),
            "hsin" => Ok(CrossfadeCurve::Hsin),
            "log" => Ok(CrossfadeCurve::Log),
            "exp" => Ok(CrossfadeCurve::Exp),
            _ => Err(AssemblyError::UnknownCurve(s.to_string())),
        }
    }
}

/// 交叉淡化设置，`duration` 为 0 时表示直接拼接
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CrossfadeSpec {
    pub duration: Duration,
    pub curve: CrossfadeCurve,
}

impl CrossfadeSpec {
    pub fn new(duration: Duration, curve: CrossfadeCurve) -> Self {
        Self { duration, curve }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_secs(secs: f64, curve: CrossfadeCurve) -> Result<Self, AssemblyError> {
        let duration =
            Duration::try_from_secs_f64(secs).map_err(|_| AssemblyError::InvalidCrossfade(secs))?;
        Ok(Self::new(duration, curve))
    }

    pub fn is_enabled(&self) -> bool {
        !self.duration.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVES: [CrossfadeCurve; 5] = [
        CrossfadeCurve::Tri,
        CrossfadeCurve::Qsin,
        CrossfadeCurve::Hsin,
        CrossfadeCurve::Log,
        CrossfadeCurve::Exp,
    ];

    #[test]
    fn test_curves_reach_endpoints() {
        for curve in CURVES {
            assert!(curve.gain(0.0) < 1e-4, "{} at 0", curve);
            assert!((curve.gain(1.0) - 1.0).abs() < 1e-9, "{} at 1", curve);
        }
    }

    #[test]
    fn test_curves_are_monotonic() {
        for curve in CURVES {
            let mut prev = curve.gain(0.0);
            for step in 1..=100 {
                let g = curve.gain(step as f64 / 100.0);
                assert!(g >= prev, "{} not monotonic at step {}", curve, step);
                prev = g;
            }
        }
    }

    #[test]
    fn test_hsin_is_symmetric() {
        let curve = CrossfadeCurve::Hsin;
        assert!((curve.gain(0.5) - 0.5).abs() < 1e-9);
        assert!((curve.gain(0.25) + curve.gain(0.75) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_and_default() {
        assert_eq!(CrossfadeCurve::default(), CrossfadeCurve::Hsin);
        assert_eq!("QSIN".parse::<CrossfadeCurve>().unwrap(), CrossfadeCurve::Qsin);
        assert!("cubic".parse::<CrossfadeCurve>().is_err());
    }

    #[test]
    fn test_spec_from_secs() {
        assert!(CrossfadeSpec::from_secs(0.05, CrossfadeCurve::Tri).unwrap().is_enabled());
        assert!(!CrossfadeSpec::from_secs(0.0, CrossfadeCurve::Tri).unwrap().is_enabled());
        assert!(CrossfadeSpec::from_secs(-0.1, CrossfadeCurve::Tri).is_err());
        assert!(CrossfadeSpec::from_secs(f64::NAN, CrossfadeCurve::Tri).is_err());
        assert!(CrossfadeSpec::from_secs(1e300, CrossfadeCurve::Tri).is_err());
    }
}
