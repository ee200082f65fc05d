// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 二级模型组件与标签表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::fmt;

pub trait WithLabel: Sized + fmt::Debug {
  const CLASS_NUM: usize;

  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Option<Self>;
}

macro_rules! label_table {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum $name {
      $($variant),+
    }

    impl $name {
      const ALL: &'static [$name] = &[$($name::$variant),+];
    }

    impl WithLabel for $name {
      const CLASS_NUM: usize = $name::ALL.len();

      fn to_label_str(&self) -> String {
        match self {
          $($name::$variant => $label.to_string()),+
        }
      }

      fn to_label_id(&self) -> u32 {
        *self as u32
      }

      fn from_label_id(id: u32) -> Option<Self> {
        $name::ALL.get(id as usize).copied()
      }
    }
  };
}

label_table! {
  /// 车辆颜色分类器的类别
  VehicleColor {
    Black => "black",
    Blue => "blue",
    Brown => "brown",
    Gold => "gold",
    Green => "green",
    Grey => "grey",
    Maroon => "maroon",
    Orange => "orange",
    Red => "red",
    Silver => "silver",
    White => "white",
    Yellow => "yellow",
  }
}

label_table! {
  /// 车辆品牌分类器的类别
  VehicleMake {
    Acura => "Acura",
    Audi => "Audi",
    Bmw => "BMW",
    Chevrolet => "Chevrolet",
    Chrysler => "Chrysler",
    Dodge => "Dodge",
    Ford => "Ford",
    Gmc => "GMC",
    Honda => "Honda",
    Hyundai => "Hyundai",
    Infiniti => "Infiniti",
    Jeep => "Jeep",
    Kia => "Kia",
    Lexus => "Lexus",
    Mazda => "Mazda",
    Mercedes => "Mercedes",
    Nissan => "Nissan",
    Subaru => "Subaru",
    Toyota => "Toyota",
    Volkswagen => "Volkswagen",
  }
}

label_table! {
  /// 车辆类型分类器的类别
  VehicleType {
    Coupe => "coupe",
    LargeVehicle => "largevehicle",
    Sedan => "sedan",
    Suv => "suv",
    Truck => "truck",
    Van => "van",
  }
}

/// 车辆属性槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
  Color,
  Make,
  Type,
}

impl Attribute {
  /// 该属性分类器输出层应有的类别数
  pub fn class_num(&self) -> usize {
    match self {
      Attribute::Color => VehicleColor::CLASS_NUM,
      Attribute::Make => VehicleMake::CLASS_NUM,
      Attribute::Type => VehicleType::CLASS_NUM,
    }
  }

  pub fn class_label(&self, class_index: usize) -> Option<String> {
    let id = u32::try_from(class_index).ok()?;
    match self {
      Attribute::Color => VehicleColor::from_label_id(id).map(|c| c.to_label_str()),
      Attribute::Make => VehicleMake::from_label_id(id).map(|c| c.to_label_str()),
      Attribute::Type => VehicleType::from_label_id(id).map(|c| c.to_label_str()),
    }
  }
}

impl fmt::Display for Attribute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Attribute::Color => write!(f, "颜色"),
      Attribute::Make => write!(f, "品牌"),
      Attribute::Type => write!(f, "类型"),
    }
  }
}

/// 各属性分类器输出层的类别数，默认取内置标签表的大小
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCounts {
  pub color: usize,
  pub make: usize,
  pub vehicle_type: usize,
}

impl Default for ClassCounts {
  fn default() -> Self {
    Self {
      color: Attribute::Color.class_num(),
      make: Attribute::Make.class_num(),
      vehicle_type: Attribute::Type.class_num(),
    }
  }
}

impl ClassCounts {
  pub fn get(&self, attribute: Attribute) -> usize {
    match attribute {
      Attribute::Color => self.color,
      Attribute::Make => self.make,
      Attribute::Type => self.vehicle_type,
    }
  }
}

/// 产生附加元数据的模型组件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
  LicensePlate,
  Attribute(Attribute),
}

/// 组件 ID 到模型组件的映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentIds {
  pub license_plate: u32,
  pub color: u32,
  pub make: u32,
  pub vehicle_type: u32,
}

impl Default for ComponentIds {
  fn default() -> Self {
    Self {
      license_plate: 3,
      color: 4,
      make: 5,
      vehicle_type: 6,
    }
  }
}

impl ComponentIds {
  pub fn resolve(&self, component_id: u32) -> Option<Component> {
    if component_id == self.license_plate {
      Some(Component::LicensePlate)
    } else if component_id == self.color {
      Some(Component::Attribute(Attribute::Color))
    } else if component_id == self.make {
      Some(Component::Attribute(Attribute::Make))
    } else if component_id == self.vehicle_type {
      Some(Component::Attribute(Attribute::Type))
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_class_num() {
    assert_eq!(Attribute::Color.class_num(), 12);
    assert_eq!(Attribute::Make.class_num(), 20);
    assert_eq!(Attribute::Type.class_num(), 6);
  }

  #[test]
  fn test_default_class_counts() {
    let counts = ClassCounts::default();
    assert_eq!(counts.get(Attribute::Color), 12);
    assert_eq!(counts.get(Attribute::Make), 20);
    assert_eq!(counts.get(Attribute::Type), 6);
  }

  #[test]
  fn test_label_lookup() {
    assert_eq!(Attribute::Color.class_label(8).as_deref(), Some("red"));
    assert_eq!(Attribute::Make.class_label(2).as_deref(), Some("BMW"));
    assert_eq!(Attribute::Type.class_label(6), None);
    assert_eq!(VehicleType::Suv.to_label_id(), 3);
  }

  #[test]
  fn test_default_component_ids() {
    let ids = ComponentIds::default();
    assert_eq!(ids.resolve(3), Some(Component::LicensePlate));
    assert_eq!(ids.resolve(4), Some(Component::Attribute(Attribute::Color)));
    assert_eq!(ids.resolve(5), Some(Component::Attribute(Attribute::Make)));
    assert_eq!(ids.resolve(6), Some(Component::Attribute(Attribute::Type)));
    assert_eq!(ids.resolve(1), None);
  }
}
