//! The transition table.

use super::{ListEffect, ListId, StatusEntity, Transition};
use crate::commerce::types::{Delivery, DeliveryStatus, PackagingRequest, PackagingStatus};

use ListEffect::{AddTo, RemoveFrom};

pub const START_PACKAGING: Transition<PackagingStatus> = Transition {
  name: "start-packaging",
  to: PackagingStatus::InProgress,
  effects: &[
    RemoveFrom(ListId::NewPackaging),
    AddTo(ListId::InProgressPackaging),
  ],
};

pub const COMPLETE_PACKAGING: Transition<PackagingStatus> = Transition {
  name: "complete-packaging",
  to: PackagingStatus::Completed,
  effects: &[
    RemoveFrom(ListId::NewPackaging),
    RemoveFrom(ListId::InProgressPackaging),
    AddTo(ListId::CompletedPackaging),
  ],
};

pub const START_DELIVERY: Transition<DeliveryStatus> = Transition {
  name: "start-delivery",
  to: DeliveryStatus::InProgress,
  effects: &[
    RemoveFrom(ListId::NewDeliveries),
    AddTo(ListId::InProgressDeliveries),
  ],
};

pub const COMPLETE_DELIVERY: Transition<DeliveryStatus> = Transition {
  name: "complete-delivery",
  to: DeliveryStatus::Completed,
  effects: &[RemoveFrom(ListId::InProgressDeliveries)],
};

pub const FAIL_DELIVERY: Transition<DeliveryStatus> = Transition {
  name: "fail-delivery",
  to: DeliveryStatus::Failed,
  effects: &[RemoveFrom(ListId::InProgressDeliveries)],
};

impl StatusEntity for PackagingRequest {
  type Status = PackagingStatus;

  fn set_status(&mut self, status: PackagingStatus) {
    self.status = status;
  }
}

impl StatusEntity for Delivery {
  type Status = DeliveryStatus;

  fn set_status(&mut self, status: DeliveryStatus) {
    self.status = status;
  }
}
